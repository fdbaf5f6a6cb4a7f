//! Sequential coordinator
//!
//! A chain runs its steps strictly one at a time in list order. Step `k + 1`
//! is not started until step `k` has settled and its callback has returned.
//! Callbacks steer the run through [`ChainControl`]: short-circuit jumps to the
//! terminal hook with custom values, abort stops without calling it.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::descriptor::ChainStep;
use super::events::{Emitter, EventSink, KernelEvent};
use crate::core::config::KernelConfig;
use crate::core::errors::{Result, TandemError};

type LastHook<V> = Box<dyn FnOnce(Vec<V>) + Send>;

/// Control handle passed to every step callback.
///
/// Both flags are terminal: once set they are never cleared for the run.
pub struct ChainControl<V> {
    short_circuit: Option<Vec<V>>,
    aborted: bool,
}

impl<V> ChainControl<V> {
    fn new() -> Self {
        Self {
            short_circuit: None,
            aborted: false,
        }
    }

    /// Skip the remaining steps and call the terminal hook with `values`.
    /// A later call in the same callback replaces the recorded values.
    pub fn short_circuit(&mut self, values: Vec<V>) {
        self.short_circuit = Some(values);
    }

    /// Stop the run; the terminal hook is never called
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_short_circuited(&self) -> bool {
        self.short_circuit.is_some()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

/// How a chain run ended. Step indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every step ran; the terminal hook was called with no values
    Completed { steps: usize },
    /// A callback short-circuited; the terminal hook got its values
    ShortCircuited { at_step: usize },
    /// A callback aborted; the terminal hook was not called
    Aborted { at_step: usize },
    /// A continuation was dropped without settling
    Stalled { at_step: usize },
}

/// Sequential coordinator over a queue of [`ChainStep`]s
pub struct Chain<V = serde_json::Value> {
    queue: VecDeque<ChainStep<V>>,
    last: Option<LastHook<V>>,
    label: String,
    emitter: Emitter,
}

impl<V: Send + 'static> Chain<V> {
    /// Build a chain; nothing runs until [`run`](Self::run) or
    /// [`spawn`](Self::spawn)
    pub fn new(steps: Vec<ChainStep<V>>) -> Self {
        Self {
            queue: steps.into_iter().collect(),
            last: None,
            label: "chain".to_string(),
            emitter: Emitter::new(),
        }
    }

    /// Build a chain checked against the configured length limit
    pub fn with_config(steps: Vec<ChainStep<V>>, config: &KernelConfig) -> Result<Self> {
        config.validate()?;
        if steps.len() > config.max_chain_length {
            return Err(TandemError::validation_field(
                format!(
                    "chain has {} steps, limit is {}",
                    steps.len(),
                    config.max_chain_length
                ),
                "steps",
            ));
        }
        let mut chain = Self::new(steps);
        chain.label = config.label.clone();
        Ok(chain)
    }

    /// Install the terminal hook. It receives no values on normal completion
    /// and the recorded values after a short-circuit.
    pub fn set_last<F>(&mut self, hook: F)
    where
        F: FnOnce(Vec<V>) + Send + 'static,
    {
        self.last = Some(Box::new(hook));
    }

    /// Builder form of [`set_last`](Self::set_last)
    pub fn with_last<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(Vec<V>) + Send + 'static,
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

    /// Steps not yet started
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Start the chain on the tokio runtime and return immediately
    pub fn spawn(self) -> JoinHandle<ChainOutcome> {
        tokio::spawn(self.run())
    }

    /// Drive the chain to its end.
    ///
    /// Steps are pulled off the front of the queue in a loop, so operations
    /// that settle synchronously never deepen the stack. A continuation that
    /// is held but never settled leaves this future pending forever.
    pub async fn run(mut self) -> ChainOutcome {
        let total = self.queue.len();
        info!(
            "Starting chain '{}' ({}) with {} steps",
            self.label,
            self.emitter.run_id(),
            total
        );
        self.emitter.emit(KernelEvent::ChainStarted {
            label: self.label.clone(),
            steps: total,
        });

        let mut control = ChainControl::new();
        let mut index = 0;

        while let Some(step) = self.queue.pop_front() {
            let (operation, args, callback) = step.into_parts();
            debug!("Chain '{}' step {}: {}", self.label, index, operation.name());
            self.emitter.emit(KernelEvent::StepStarted {
                index,
                operation: operation.name().to_string(),
            });

            let Some(values) = operation.invoke(args).await else {
                warn!(
                    "Chain '{}' stalled at step {}: continuation dropped without settling",
                    self.label, index
                );
                self.emitter.emit(KernelEvent::Stalled {
                    index: Some(index),
                    outstanding: self.queue.len() + 1,
                });
                return ChainOutcome::Stalled { at_step: index };
            };

            self.emitter.emit(KernelEvent::StepSettled {
                index,
                values: values.len(),
            });
            if let Some(callback) = callback {
                callback(values, &mut control);
            }

            if let Some(values) = control.short_circuit.take() {
                info!("Chain '{}' short-circuited at step {}", self.label, index);
                self.emitter.emit(KernelEvent::ShortCircuited { index });
                self.finish(values);
                return ChainOutcome::ShortCircuited { at_step: index };
            }
            if control.aborted {
                info!("Chain '{}' aborted at step {}", self.label, index);
                self.emitter.emit(KernelEvent::Aborted { index });
                return ChainOutcome::Aborted { at_step: index };
            }
            index += 1;
        }

        info!("Chain '{}' completed {} steps", self.label, total);
        self.emitter.emit(KernelEvent::ChainFinished { steps: total });
        self.finish(Vec::new());
        ChainOutcome::Completed { steps: total }
    }

    fn finish(&mut self, values: Vec<V>) {
        if let Some(last) = self.last.take() {
            last(values);
        }
    }
}
