#![forbid(unsafe_code)]

//! Execution contexts.
//!
//! A [`Scheduler`] accepts a unit of work and eventually runs it to
//! completion. Commands use one to place synchronous executions; the UI
//! property decorator uses one to reach the host's UI thread. Any
//! `Fn(Work) + Send + Sync` closure is a scheduler.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::sync::lock;

/// A unit of work handed to a [`Scheduler`].
pub type Work = Box<dyn FnOnce() + Send>;

/// Accepts work and eventually runs it.
pub trait Scheduler: Send + Sync {
    /// Submit `work`. It must run exactly once.
    fn schedule(&self, work: Work);
}

impl<F> Scheduler for F
where
    F: Fn(Work) + Send + Sync,
{
    fn schedule(&self, work: Work) {
        self(work);
    }
}

/// Runs work inline on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, work: Work) {
        work();
    }
}

/// Runs each unit of work on a fresh, named OS thread.
#[derive(Debug, Clone)]
pub struct ThreadScheduler {
    name: String,
}

impl ThreadScheduler {
    /// Create a scheduler whose threads are named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The thread name used for spawned work.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new("rxmvvm-exec")
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, work: Work) {
        let slot = Arc::new(Mutex::new(Some(work)));
        let spawned = Arc::clone(&slot);
        let result = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                if let Some(work) = lock(&spawned).take() {
                    work();
                }
            });
        if let Err(error) = result {
            tracing::warn!(%error, thread = %self.name, "thread spawn failed; running inline");
            let work = lock(&slot).take();
            if let Some(work) = work {
                work();
            }
        }
    }
}

/// Queues work until the host drains it.
///
/// Models a UI event loop: [`schedule`](Scheduler::schedule) only enqueues,
/// and [`run_pending`](Self::run_pending) runs everything queued so far,
/// including work scheduled by the work itself.
#[derive(Clone, Default)]
pub struct QueueScheduler {
    queue: Arc<Mutex<VecDeque<Work>>>,
}

impl QueueScheduler {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run queued work until the queue is empty. Returns the number of units run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let work = lock(&self.queue).pop_front();
            match work {
                Some(work) => {
                    work();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Number of queued units.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, work: Work) {
        lock(&self.queue).push_back(work);
    }
}

impl fmt::Debug for QueueScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
