//! Operation descriptors
//!
//! A descriptor binds an operation, the arguments it is called with and an
//! optional callback that observes the settled values. Chains and groups own
//! their descriptors and consume each one exactly once.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::chain::ChainControl;

/// Trailing continuation handed to callback-style operations.
///
/// Settling consumes the continuation, so an operation can settle at most
/// once. Dropping it without settling is reported by the run as a stall.
pub struct Continuation<V> {
    tx: oneshot::Sender<Vec<V>>,
}

impl<V> Continuation<V> {
    /// Settle with zero or more result values
    pub fn settle(self, values: Vec<V>) {
        // The receiver is gone only when the run itself was dropped.
        let _ = self.tx.send(values);
    }

    /// Settle with a single value
    pub fn settle_one(self, value: V) {
        self.settle(vec![value]);
    }

    /// Settle with no values
    pub fn done(self) {
        self.settle(Vec::new());
    }
}

/// Trait-based operation, for callers that keep state alongside the work
#[async_trait]
pub trait Action<V>: Send + Sync {
    /// Name used in logs and events
    fn name(&self) -> &str;

    /// Perform the work and return the values to settle with
    async fn call(&self, args: Vec<V>) -> Vec<V>;
}

type CallbackFn<V> = Arc<dyn Fn(Vec<V>, Continuation<V>) + Send + Sync>;
type AsyncFn<V> = Arc<dyn Fn(Vec<V>) -> BoxFuture<'static, Vec<V>> + Send + Sync>;

enum OperationKind<V> {
    Callback(CallbackFn<V>),
    Async(AsyncFn<V>),
    Action(Arc<dyn Action<V>>),
}

/// Shareable reference to an operation.
///
/// Cloning is cheap; the same operation can back many descriptors.
pub struct Operation<V> {
    name: String,
    kind: OperationKind<V>,
}

impl<V> Clone for Operation<V> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            OperationKind::Callback(f) => OperationKind::Callback(f.clone()),
            OperationKind::Async(f) => OperationKind::Async(f.clone()),
            OperationKind::Action(a) => OperationKind::Action(a.clone()),
        };
        Self {
            name: self.name.clone(),
            kind,
        }
    }
}

impl<V> std::fmt::Debug for Operation<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            OperationKind::Callback(_) => "callback",
            OperationKind::Async(_) => "async",
            OperationKind::Action(_) => "action",
        };
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

impl<V: Send + 'static> Operation<V> {
    /// Callback-last operation: receives its arguments plus a continuation
    /// it must settle exactly once, synchronously or later.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Vec<V>, Continuation<V>) + Send + Sync + 'static,
    {
        Self {
            name: "operation".to_string(),
            kind: OperationKind::Callback(Arc::new(f)),
        }
    }

    /// Future-returning operation; the output is the settled values
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<V>> + Send + 'static,
    {
        Self {
            name: "operation".to_string(),
            kind: OperationKind::Async(Arc::new(move |args| f(args).boxed())),
        }
    }

    /// Operation backed by an [`Action`] implementation
    pub fn from_action(action: Arc<dyn Action<V>>) -> Self {
        Self {
            name: action.name().to_string(),
            kind: OperationKind::Action(action),
        }
    }

    /// Set the name used in logs and events
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the operation. Resolves to `None` when a continuation was
    /// dropped without settling.
    pub(crate) fn invoke(&self, args: Vec<V>) -> BoxFuture<'static, Option<Vec<V>>> {
        match &self.kind {
            OperationKind::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                f(args, Continuation { tx });
                async move { rx.await.ok() }.boxed()
            }
            OperationKind::Async(f) => f(args).map(Some).boxed(),
            OperationKind::Action(action) => {
                let action = action.clone();
                async move { Some(action.call(args).await) }.boxed()
            }
        }
    }
}

/// Callback run after a chain step settles
pub type StepCallback<V> = Box<dyn FnOnce(Vec<V>, &mut ChainControl<V>) + Send>;

/// Callback run after a group item settles
pub type ItemCallback<V> = Box<dyn FnOnce(Vec<V>) + Send>;

/// {operation, args, callback?}
pub struct Descriptor<V, C> {
    operation: Operation<V>,
    args: Vec<V>,
    callback: Option<C>,
}

/// Descriptor consumed by a [`Chain`](super::Chain)
pub type ChainStep<V = serde_json::Value> = Descriptor<V, StepCallback<V>>;

/// Descriptor consumed by a [`Group`](super::Group)
pub type GroupItem<V = serde_json::Value> = Descriptor<V, ItemCallback<V>>;

impl<V, C> Descriptor<V, C> {
    pub fn operation(&self) -> &Operation<V> {
        &self.operation
    }

    pub fn args(&self) -> &[V] {
        &self.args
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn into_parts(self) -> (Operation<V>, Vec<V>, Option<C>) {
        (self.operation, self.args, self.callback)
    }
}

impl<V: Send + 'static> Descriptor<V, StepCallback<V>> {
    /// Chain step without a callback
    pub fn step(operation: Operation<V>, args: Vec<V>) -> Self {
        Self {
            operation,
            args,
            callback: None,
        }
    }

    /// Attach the step callback. It receives the settled values verbatim and
    /// may short-circuit or abort the chain through the control handle.
    pub fn on_step<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Vec<V>, &mut ChainControl<V>) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }
}

impl<V: Send + 'static> Descriptor<V, ItemCallback<V>> {
    /// Group item without a callback
    pub fn item(operation: Operation<V>, args: Vec<V>) -> Self {
        Self {
            operation,
            args,
            callback: None,
        }
    }

    /// Attach the item callback; it receives the settled values verbatim
    pub fn on_settle<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Vec<V>) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }
}
