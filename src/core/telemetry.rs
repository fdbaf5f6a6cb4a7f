//! Tracing subscriber setup

use tracing_subscriber::fmt::SubscriberBuilder;

use crate::core::config::KernelConfig;
use crate::core::errors::Result;

/// Installs a fmt subscriber at the configured level.
///
/// Returns Ok when a global subscriber is already installed, so tests and
/// embedding applications can call this freely.
pub fn init_tracing(config: &KernelConfig) -> Result<()> {
    let level = config.tracing_level()?;
    if fmt_builder(level).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}

fn fmt_builder(level: tracing::Level) -> SubscriberBuilder {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_subscriber_at_configured_level() {
        let config = KernelConfig {
            log_level: "debug".to_string(),
            ..KernelConfig::default()
        };
        let level = config.tracing_level().unwrap();
        let subscriber = fmt_builder(level).with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(tracing::Level::DEBUG));
            assert!(!tracing::enabled!(tracing::Level::TRACE));
        });
    }

    #[test]
    fn test_invalid_level() {
        let config = KernelConfig {
            log_level: "chatty".to_string(),
            ..KernelConfig::default()
        };
        assert!(init_tracing(&config).is_err());
    }
}
