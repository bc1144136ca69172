#![forbid(unsafe_code)]

//! Monotonic progress channel.
//!
//! # Invariants
//!
//! 1. Published values lie in `[0.0, 1.0]` and never decrease.
//! 2. Negative and NaN writes are ignored; writes above `1.0` are clamped.
//! 3. Once an execution settles its context is sealed and later writes from
//!    that execution are ignored.

use std::fmt;
use std::sync::{Arc, Mutex};

use rxmvvm_core::sync::lock;
use rxmvvm_core::{Notification, Observable, Subject};

struct ProgressState {
    value: f32,
    sealed: bool,
}

struct ProgressInner {
    subject: Subject<f32>,
    state: Mutex<ProgressState>,
}

/// Write handle for the progress of one execution.
#[derive(Clone)]
pub struct ProgressContext {
    inner: Arc<ProgressInner>,
}

impl ProgressContext {
    /// A standalone progress channel starting at `0.0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ProgressInner {
                subject: Subject::replaying(0.0),
                state: Mutex::new(ProgressState {
                    value: 0.0,
                    sealed: false,
                }),
            }),
        }
    }

    /// A context bound to a command's progress stream, queueing the reset to
    /// `0.0` if the stream shows anything else. The caller drains.
    pub(crate) fn start(subject: &Subject<f32>) -> Self {
        if subject.latest() != Some(0.0) {
            subject.enqueue(Notification::Next(0.0));
        }
        Self {
            inner: Arc::new(ProgressInner {
                subject: subject.clone(),
                state: Mutex::new(ProgressState {
                    value: 0.0,
                    sealed: false,
                }),
            }),
        }
    }

    /// Report progress. See the module invariants for what is ignored.
    pub fn set(&self, value: f32) {
        if value.is_nan() || value < 0.0 {
            return;
        }
        self.advance(|_| value);
    }

    /// Advance progress by `delta`. Non-positive deltas are ignored.
    pub fn add(&self, delta: f32) {
        if delta.is_nan() || delta <= 0.0 {
            return;
        }
        self.advance(|current| current + delta);
    }

    /// The latest accepted value.
    #[must_use]
    pub fn get(&self) -> f32 {
        lock(&self.inner.state).value
    }

    /// Stream of accepted values, starting with the current one.
    #[must_use]
    pub fn as_observable(&self) -> Observable<f32> {
        self.inner.subject.as_observable()
    }

    /// Queue `1.0` unless already there and stop accepting writes.
    /// The caller drains.
    pub(crate) fn finish(&self) {
        let mut state = lock(&self.inner.state);
        if state.sealed {
            return;
        }
        state.sealed = true;
        if state.value < 1.0 {
            state.value = 1.0;
            self.inner.subject.enqueue(Notification::Next(1.0));
        }
    }

    fn advance(&self, target: impl FnOnce(f32) -> f32) {
        {
            let mut state = lock(&self.inner.state);
            let next = target(state.value).min(1.0);
            if state.sealed || next <= state.value {
                return;
            }
            state.value = next;
            self.inner.subject.enqueue(Notification::Next(next));
        }
        self.inner.subject.drain();
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgressContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("ProgressContext")
            .field("value", &state.value)
            .field("sealed", &state.sealed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxmvvm_harness::TestObserver;

    #[test]
    fn starts_at_zero() {
        let progress = ProgressContext::new();
        let observer = TestObserver::new(&progress.as_observable());
        assert_eq!(progress.get(), 0.0);
        assert_eq!(observer.values(), vec![0.0]);
    }

    #[test]
    fn ignores_smaller_and_negative_values() {
        let progress = ProgressContext::new();
        let observer = TestObserver::new(&progress.as_observable());
        progress.set(0.5);
        progress.set(0.25);
        progress.set(-1.0);
        progress.set(f32::NAN);
        progress.set(0.5);
        assert_eq!(observer.values(), vec![0.0, 0.5]);
    }

    #[test]
    fn clamps_above_one() {
        let progress = ProgressContext::new();
        progress.set(7.0);
        assert_eq!(progress.get(), 1.0);
    }

    #[test]
    fn add_accumulates() {
        let progress = ProgressContext::new();
        progress.add(0.25);
        progress.add(0.25);
        progress.add(-0.1);
        progress.add(0.0);
        assert_eq!(progress.get(), 0.5);
        progress.add(2.0);
        assert_eq!(progress.get(), 1.0);
    }

    #[test]
    fn finish_seals() {
        let subject = Subject::replaying(0.0);
        let observer = TestObserver::new(&subject.as_observable());
        let progress = ProgressContext::start(&subject);
        progress.set(0.5);
        progress.finish();
        subject.drain();
        progress.set(0.75);
        assert_eq!(observer.values(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn start_resets_a_finished_stream() {
        let subject = Subject::replaying(1.0);
        let observer = TestObserver::new(&subject.as_observable());
        let _progress = ProgressContext::start(&subject);
        subject.drain();
        assert_eq!(observer.values(), vec![1.0, 0.0]);
    }
}
