//! Deferred (lazily loaded) extension fields.
//!
//! # Responsibility
//! - Wrap a loader that produces one property value on demand.
//! - Memoize the outcome so the loader runs at most once per field.
//!
//! # Invariants
//! - A field moves `Unresolved -> Loading -> Resolved | Failed` and never
//!   leaves a terminal state; there is no retry.
//! - A started load stays attached to the field even when the awaiting caller
//!   is dropped; the next caller continues the same load.

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of one loader invocation.
pub type LoadResult = Result<Value, LoadError>;

type LoaderFn = dyn Fn() -> BoxFuture<'static, LoadResult> + Send + Sync;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Failure reported by a deferred field loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Observable lifecycle of one deferred field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unresolved,
    Loading,
    Resolved,
    Failed,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }
}

/// Property value supplied as a loader and resolved only by the resolver.
///
/// Clones share the memoized outcome, so cloning an extension never causes a
/// second loader invocation.
#[derive(Clone)]
pub struct DeferredField {
    loader: Arc<LoaderFn>,
    slot: Arc<OnceCell<SharedLoad>>,
}

impl DeferredField {
    /// Wraps an async loader.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self::from_loader(Arc::new(move || loader().boxed()))
    }

    /// Deferred field that fails on resolution with `message`.
    ///
    /// Used for declarations whose loader could not be bound, so the failure
    /// surfaces per extension at resolve time instead of aborting aggregation.
    pub fn failing(message: impl Into<String>) -> Self {
        let error = LoadError::new(message);
        Self::new(move || futures::future::ready(Err(error.clone())))
    }

    pub(crate) fn from_loader(loader: Arc<LoaderFn>) -> Self {
        Self {
            loader,
            slot: Arc::new(OnceCell::new()),
        }
    }

    /// Same loader, fresh memoization slot.
    pub(crate) fn detached(&self) -> Self {
        Self::from_loader(Arc::clone(&self.loader))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoadState {
        match self.slot.get().map(Shared::peek) {
            None => LoadState::Unresolved,
            Some(None) => LoadState::Loading,
            Some(Some(Ok(_))) => LoadState::Resolved,
            Some(Some(Err(_))) => LoadState::Failed,
        }
    }

    /// Resolves the field, starting the loader on first use.
    pub async fn load(&self) -> LoadResult {
        let load = self.slot.get_or_init(|| (self.loader)().shared()).clone();
        load.await
    }
}

impl Debug for DeferredField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredField")
            .field("state", &self.state())
            .finish()
    }
}

/// Shared handle to a loader function, used when one loader backs many fields.
#[derive(Clone)]
pub struct LoaderHandle(Arc<LoaderFn>);

impl LoaderHandle {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self(Arc::new(move || loader().boxed()))
    }

    /// Creates a fresh field with its own memoization slot.
    pub fn field(&self) -> DeferredField {
        DeferredField::from_loader(Arc::clone(&self.0))
    }
}

impl Debug for LoaderHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoaderHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::{DeferredField, LoadError, LoadState, LoaderHandle};
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_field(calls: Arc<AtomicUsize>) -> DeferredField {
        DeferredField::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("card"))
            }
        })
    }

    #[test]
    fn loads_once_and_memoizes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let field = counting_field(Arc::clone(&calls));
        assert_eq!(field.state(), LoadState::Unresolved);

        assert_eq!(block_on(field.load()), Ok(json!("card")));
        assert_eq!(block_on(field.load()), Ok(json!("card")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(field.state(), LoadState::Resolved);
    }

    #[test]
    fn clones_share_the_outcome() {
        let calls = Arc::new(AtomicUsize::new(0));
        let field = counting_field(Arc::clone(&calls));
        let copy = field.clone();

        block_on(field.load()).expect("first load");
        block_on(copy.load()).expect("clone load");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(copy.state(), LoadState::Resolved);
    }

    #[test]
    fn failure_is_terminal() {
        let field = DeferredField::failing("chunk missing");
        let err = block_on(field.load()).expect_err("failing field");
        assert_eq!(err, LoadError::new("chunk missing"));
        assert_eq!(field.state(), LoadState::Failed);
        assert!(field.state().is_terminal());
        assert!(block_on(field.load()).is_err());
    }

    #[test]
    fn loader_handle_creates_independent_slots() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = LoaderHandle::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(1))
            }
        });

        let first = handle.field();
        let second = handle.field();
        block_on(first.load()).expect("first field");
        assert_eq!(second.state(), LoadState::Unresolved);
        block_on(second.load()).expect("second field");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
