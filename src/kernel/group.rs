//! Parallel coordinator
//!
//! A group launches every item at once and joins on an outstanding count.
//! Items cannot be cancelled and carry no aggregated status: the terminal hook
//! only learns that the count reached zero.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::descriptor::GroupItem;
use super::events::{Emitter, EventSink, KernelEvent};
use crate::core::config::KernelConfig;
use crate::core::errors::{Result, TandemError};

type LastHook = Box<dyn FnOnce() + Send>;

/// How a group run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Every item settled and the terminal hook was called
    Joined { items: usize },
    /// Some continuations were dropped; the count never reached zero
    Stalled { outstanding: usize },
}

/// Fan-out/join coordinator over [`GroupItem`]s
pub struct Group<V = serde_json::Value> {
    items: Vec<GroupItem<V>>,
    outstanding: usize,
    last: Option<LastHook>,
    label: String,
    emitter: Emitter,
}

impl<V: Send + 'static> Group<V> {
    pub fn new(items: Vec<GroupItem<V>>) -> Self {
        Self {
            outstanding: items.len(),
            items,
            last: None,
            label: "group".to_string(),
            emitter: Emitter::new(),
        }
    }

    /// Build a group checked against the configured size limit
    pub fn with_config(items: Vec<GroupItem<V>>, config: &KernelConfig) -> Result<Self> {
        config.validate()?;
        if items.len() > config.max_group_size {
            return Err(TandemError::validation_field(
                format!(
                    "group has {} items, limit is {}",
                    items.len(),
                    config.max_group_size
                ),
                "items",
            ));
        }
        let mut group = Self::new(items);
        group.label = config.label.clone();
        Ok(group)
    }

    /// Install the terminal hook, called once when every item has settled
    pub fn set_last<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.last = Some(Box::new(hook));
    }

    pub fn with_last<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.set_last(hook);
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.emitter.set_sink(sink);
        self
    }

    pub fn run_id(&self) -> &str {
        self.emitter.run_id()
    }

    /// Items not yet settled. Only decreases, and only while running.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Start the group on the tokio runtime and return immediately
    pub fn spawn(self) -> JoinHandle<GroupOutcome> {
        tokio::spawn(self.run())
    }

    /// Launch all items, then handle settlements one at a time as they
    /// arrive. Item callbacks never overlap.
    pub async fn run(mut self) -> GroupOutcome {
        let total = self.items.len();
        info!(
            "Starting group '{}' ({}) with {} items",
            self.label,
            self.emitter.run_id(),
            total
        );
        self.emitter.emit(KernelEvent::GroupStarted {
            label: self.label.clone(),
            items: total,
        });

        if total == 0 {
            self.join(0);
            return GroupOutcome::Joined { items: 0 };
        }

        let mut pending = FuturesUnordered::new();
        for (index, item) in self.items.drain(..).enumerate() {
            let (operation, args, callback) = item.into_parts();
            debug!("Group '{}' launching item {}: {}", self.label, index, operation.name());
            let settled = operation.invoke(args);
            pending.push(async move { (index, callback, settled.await) });
        }

        while let Some((index, callback, settled)) = pending.next().await {
            let Some(values) = settled else {
                warn!(
                    "Group '{}' item {} dropped its continuation without settling",
                    self.label, index
                );
                continue;
            };
            if let Some(callback) = callback {
                callback(values);
            }
            self.outstanding -= 1;
            let outstanding = self.outstanding;
            debug!("Group '{}' item {} settled, {} outstanding", self.label, index, outstanding);
            self.emitter.emit(KernelEvent::ItemSettled { index, outstanding });
            if outstanding == 0 {
                self.join(total);
                return GroupOutcome::Joined { items: total };
            }
        }

        let outstanding = self.outstanding;
        warn!(
            "Group '{}' stalled with {} of {} items outstanding",
            self.label, outstanding, total
        );
        self.emitter.emit(KernelEvent::Stalled {
            index: None,
            outstanding,
        });
        GroupOutcome::Stalled { outstanding }
    }

    fn join(&mut self, items: usize) {
        info!("Group '{}' joined {} items", self.label, items);
        self.emitter.emit(KernelEvent::GroupJoined { items });
        if let Some(last) = self.last.take() {
            last();
        }
    }
}
