//! Event system for chains and groups
//!
//! Provides typed lifecycle events for observers of a run

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KernelEvent {
    ChainStarted {
        label: String,
        steps: usize,
    },
    StepStarted {
        index: usize,
        operation: String,
    },
    StepSettled {
        index: usize,
        values: usize,
    },
    ShortCircuited {
        index: usize,
    },
    Aborted {
        index: usize,
    },
    ChainFinished {
        steps: usize,
    },
    GroupStarted {
        label: String,
        items: usize,
    },
    ItemSettled {
        index: usize,
        outstanding: usize,
    },
    GroupJoined {
        items: usize,
    },
    Stalled {
        index: Option<usize>,
        outstanding: usize,
    },
}

/// Event envelope with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub version: u32,
    pub sequence: u64,
    pub run_id: String,
    pub timestamp: i64,
    pub event: KernelEvent,
}

/// Event sink trait for emitting events
pub trait EventSink: Send + Sync {
    /// Emit an event
    fn emit(&self, envelope: &EventEnvelope);
}

/// A simple logging event sink
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        tracing::debug!("Event: {:?}", envelope);
    }
}

/// A buffering event sink that collects events
#[derive(Default)]
pub struct BufferingEventSink {
    events: parking_lot::RwLock<Vec<EventEnvelope>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<EventEnvelope> {
        self.events.read().clone()
    }

    /// Events without their envelopes, in emission order
    pub fn kinds(&self) -> Vec<KernelEvent> {
        self.events.read().iter().map(|e| e.event.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        self.events.write().push(envelope.clone());
    }
}

/// Global sequence counter for events
static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Get the next event sequence number
pub fn next_sequence() -> u64 {
    EVENT_SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// Binds a run id to an optional sink
#[derive(Clone)]
pub(crate) struct Emitter {
    run_id: String,
    sink: Option<Arc<dyn EventSink>>,
}

impl Emitter {
    pub(crate) fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            sink: None,
        }
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = Some(sink);
    }

    pub(crate) fn emit(&self, event: KernelEvent) {
        if let Some(sink) = &self.sink {
            let envelope = EventEnvelope {
                version: 1,
                sequence: next_sequence(),
                run_id: self.run_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                event,
            };
            sink.emit(&envelope);
        }
    }
}
