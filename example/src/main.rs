use anyhow::Result;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tandem::{Chain, Descriptor, Group, KernelConfig, LoggingEventSink, Operation};

/// Application registries, threaded explicitly instead of living in globals
#[derive(Debug, Default)]
struct AppContext {
    models: Vec<String>,
    controllers: Vec<String>,
    templates: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Registry {
    Models,
    Controllers,
    Templates,
}

impl AppContext {
    fn registry_mut(&mut self, registry: Registry) -> &mut Vec<String> {
        match registry {
            Registry::Models => &mut self.models,
            Registry::Controllers => &mut self.controllers,
            Registry::Templates => &mut self.templates,
        }
    }
}

/// Lists a directory, settling with `[error, entries]`
fn list_dir() -> Operation<Value> {
    Operation::from_async(|args: Vec<Value>| async move {
        let dir = PathBuf::from(args[0].as_str().unwrap_or("."));
        match read_names(&dir).await {
            Ok(names) => vec![Value::Null, json!(names)],
            Err(e) => vec![json!(format!("{}: {}", dir.display(), e)), Value::Null],
        }
    })
    .named("list_dir")
}

async fn read_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Turns `[error, entries]` into the entries, logging the error
fn entries(values: &[Value]) -> Vec<String> {
    match values {
        [err, _] if !err.is_null() => {
            tracing::warn!("Skipping registry: {}", err);
            Vec::new()
        }
        [_, Value::Array(items)] => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn register(
    ctx: &Arc<Mutex<AppContext>>,
    registry: Registry,
    suffix: &'static str,
) -> impl FnOnce(Vec<Value>) + Send + 'static {
    let ctx = ctx.clone();
    move |values: Vec<Value>| {
        let found: Vec<String> = entries(&values)
            .into_iter()
            .filter(|n| n.ends_with(suffix))
            .collect();
        tracing::debug!("Registering {} entries into {:?}", found.len(), registry);
        if let Ok(mut ctx) = ctx.lock() {
            ctx.registry_mut(registry).extend(found);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => KernelConfig::load_yaml_file(path)?,
        None => KernelConfig::default().with_label("bootstrap"),
    };
    tandem::init_tracing(&config)?;

    let root = std::env::args().nth(2).unwrap_or_else(|| ".".to_string());
    let app = |sub: &str| json!(format!("{}/app/{}", root, sub));
    let ctx = Arc::new(Mutex::new(AppContext::default()));

    // Populate the registries concurrently
    let group = Group::with_config(
        vec![
            Descriptor::item(list_dir(), vec![app("models")])
                .on_settle(register(&ctx, Registry::Models, ".rs")),
            Descriptor::item(list_dir(), vec![app("controllers")])
                .on_settle(register(&ctx, Registry::Controllers, ".rs")),
            Descriptor::item(list_dir(), vec![app("views")])
                .on_settle(register(&ctx, Registry::Templates, ".html")),
        ],
        &config,
    )?
    .with_event_sink(Arc::new(LoggingEventSink))
    .with_last(|| tracing::info!("Registries populated"));
    let outcome = group.run().await;
    tracing::info!("Group finished: {:?}", outcome);

    // Walk up looking for a manifest; stop early when found, bail on errors
    let mut chain = Chain::with_config(
        [root.clone(), format!("{}/..", root), format!("{}/../..", root)]
            .into_iter()
            .map(|dir| {
                Descriptor::step(list_dir(), vec![json!(dir.clone())]).on_step(move |values, ctl| {
                    if !values[0].is_null() {
                        tracing::error!("Listing failed: {}", values[0]);
                        ctl.abort();
                    } else if entries(&values).iter().any(|n| n == "Cargo.toml") {
                        ctl.short_circuit(vec![json!(dir)]);
                    }
                })
            })
            .collect(),
        &config,
    )?;
    chain.set_last(|values| match values.first() {
        Some(dir) => tracing::info!("Manifest found in {}", dir),
        None => tracing::info!("No manifest found"),
    });
    let outcome = chain.run().await;
    tracing::info!("Chain finished: {:?}", outcome);

    if let Ok(ctx) = ctx.lock() {
        println!("{:#?}", *ctx);
    }
    Ok(())
}
