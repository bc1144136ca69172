#![forbid(unsafe_code)]

//! Test harness for rxmvvm.
//!
//! - [`TestObserver`] subscribes to an [`Observable`] and records every
//!   notification it receives, so tests can assert on the exact sequence.
//! - [`strategies`] holds `proptest` strategies that generate scripts of
//!   property writes, gate toggles and progress reports.

use std::fmt;
use std::sync::{Arc, Mutex};

use rxmvvm_core::sync::lock;
use rxmvvm_core::{ErrorKind, Notification, Observable, ReactiveError, Subscription, Value};

pub mod strategies;

/// Records the notifications of one subscription.
pub struct TestObserver<T> {
    events: Arc<Mutex<Vec<Notification<T>>>>,
    subscription: Subscription,
}

impl<T: Value> TestObserver<T> {
    /// Subscribe to `source` and start recording.
    pub fn new(source: &Observable<T>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&events);
        let subscription = source.observe(move |notification| {
            lock(&recorder).push(notification);
        });
        Self {
            events,
            subscription,
        }
    }

    /// Every recorded notification, in arrival order.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification<T>> {
        lock(&self.events).clone()
    }

    /// Recorded values.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        lock(&self.events)
            .iter()
            .filter_map(|n| match n {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent value, if any.
    #[must_use]
    pub fn last_value(&self) -> Option<T> {
        self.values().pop()
    }

    /// Number of recorded values.
    #[must_use]
    pub fn value_count(&self) -> usize {
        lock(&self.events)
            .iter()
            .filter(|n| matches!(n, Notification::Next(_)))
            .count()
    }

    /// Recorded errors.
    #[must_use]
    pub fn errors(&self) -> Vec<ReactiveError> {
        lock(&self.events)
            .iter()
            .filter_map(|n| match n {
                Notification::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Kinds of the recorded errors.
    #[must_use]
    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        self.errors().iter().map(ReactiveError::kind).collect()
    }

    /// Whether completion was recorded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        lock(&self.events)
            .iter()
            .any(|n| matches!(n, Notification::Complete))
    }

    /// Whether an error or completion was recorded.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        lock(&self.events).iter().any(Notification::is_terminal)
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        lock(&self.events).clear();
    }

    /// Stop recording.
    pub fn dispose(&mut self) {
        tracing::trace!(recorded = lock(&self.events).len(), "test observer disposed");
        self.subscription.unsubscribe();
    }
}

impl<T> fmt::Debug for TestObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestObserver")
            .field("recorded", &lock(&self.events).len())
            .field("disposed", &self.subscription.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxmvvm_core::Subject;

    #[test]
    fn records_values_and_completion() {
        let observer = TestObserver::new(&Observable::from_values(vec![1, 2]));
        assert_eq!(observer.values(), vec![1, 2]);
        assert_eq!(observer.last_value(), Some(2));
        assert!(observer.is_completed());
        assert!(observer.errors().is_empty());
    }

    #[test]
    fn records_errors() {
        let observer = TestObserver::new(&Observable::<u8>::failed(ReactiveError::NoResult));
        assert_eq!(observer.error_kinds(), vec![ErrorKind::NoResult]);
        assert!(observer.is_terminated());
        assert!(!observer.is_completed());
    }

    #[test]
    fn dispose_stops_recording() {
        let subject = Subject::new();
        let mut observer = TestObserver::new(&subject.as_observable());
        subject.next(1);
        observer.dispose();
        subject.next(2);
        assert_eq!(observer.values(), vec![1]);
    }

    #[test]
    fn reset_clears_history() {
        let subject = Subject::new();
        let observer = TestObserver::new(&subject.as_observable());
        subject.next(1);
        observer.reset();
        subject.next(2);
        assert_eq!(observer.values(), vec![2]);
        assert_eq!(observer.value_count(), 1);
    }
}
