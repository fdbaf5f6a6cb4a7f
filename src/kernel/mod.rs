//! Coordination kernel
//!
//! Two primitives drive callback-style operations: [`Chain`] runs them one at
//! a time in order, [`Group`] runs them all at once and joins on completion.

pub mod chain;
pub mod descriptor;
pub mod events;
pub mod group;

pub use chain::{Chain, ChainControl, ChainOutcome};
pub use descriptor::{
    Action, ChainStep, Continuation, Descriptor, GroupItem, ItemCallback, Operation,
    StepCallback,
};
pub use events::{BufferingEventSink, EventEnvelope, EventSink, KernelEvent, LoggingEventSink};
pub use group::{Group, GroupOutcome};
