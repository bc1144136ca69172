#![forbid(unsafe_code)]

//! Normalized execution kinds.
//!
//! Every factory shape (supplier, function, stream-returning, progress
//! bearing, composite) is reduced to one [`Execution`] variant. The command
//! admits, dispatches and settles all of them through the same routine.

use std::sync::Arc;

use rxmvvm_core::{Observable, ReactiveError};

use super::progress::ProgressContext;

pub(crate) type SyncFn<T, R> = dyn Fn(Option<T>) -> Result<R, ReactiveError> + Send + Sync;
pub(crate) type AsyncFn<T, R> = dyn Fn(Option<T>) -> Observable<R> + Send + Sync;
pub(crate) type ProgressFn<T, R> =
    dyn Fn(ProgressContext, Option<T>) -> Result<R, ReactiveError> + Send + Sync;
pub(crate) type AsyncProgressFn<T, R> =
    dyn Fn(ProgressContext, Option<T>) -> Observable<R> + Send + Sync;

/// What a command runs once an execution is admitted.
pub(crate) enum Execution<T, R> {
    /// Returns the outcome directly.
    Sync(Box<SyncFn<T, R>>),
    /// Returns a stream; its first value is the result.
    Async(Box<AsyncFn<T, R>>),
    /// Like `Sync`, with a progress handle.
    Progress(Box<ProgressFn<T, R>>),
    /// Like `Async`, with a progress handle.
    AsyncProgress(Box<AsyncProgressFn<T, R>>),
    /// Fans out to child commands.
    Composite(Box<dyn CompositeLaunch<T, R>>),
}

impl<T, R> Execution<T, R> {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Async(_) => "async",
            Self::Progress(_) => "progress",
            Self::AsyncProgress(_) => "async-progress",
            Self::Composite(_) => "composite",
        }
    }
}

/// Settles one admitted execution. Only the first call has an effect.
pub(crate) struct Settlement<R> {
    settle: Arc<dyn Fn(Result<R, ReactiveError>) + Send + Sync>,
}

impl<R> Clone for Settlement<R> {
    fn clone(&self) -> Self {
        Self {
            settle: Arc::clone(&self.settle),
        }
    }
}

impl<R> Settlement<R> {
    pub(crate) fn new(settle: impl Fn(Result<R, ReactiveError>) + Send + Sync + 'static) -> Self {
        Self {
            settle: Arc::new(settle),
        }
    }

    pub(crate) fn settle(&self, outcome: Result<R, ReactiveError>) {
        (self.settle)(outcome);
    }
}

/// Starts the children of a composite for one admitted execution.
pub(crate) trait CompositeLaunch<T, R>: Send + Sync {
    fn launch(&self, input: Option<T>, progress: ProgressContext, settlement: Settlement<R>);
}
