#![forbid(unsafe_code)]

//! Hot multicast subjects with serialized delivery.
//!
//! A [`Subject`] never calls a subscriber while holding its own lock.
//! Emissions are appended to a delivery queue together with a snapshot of
//! the observers registered at that moment; whichever thread finds the queue
//! idle drains it. Emissions made while a drain is running (re-entrantly from
//! a subscriber, or from another thread) are delivered by the draining thread
//! after the current notification.
//!
//! Owners that keep their own state next to a subject (properties, commands)
//! use the split [`Subject::enqueue`] / [`Subject::drain`] pair: enqueue while
//! holding the owner's lock so the delivery order matches the state order,
//! then drain after unlocking.
//!
//! # Invariants
//!
//! 1. Every observer sees notifications in queue order.
//! 2. Only one thread delivers a given subject's notifications at a time.
//! 3. Nothing is delivered after a terminal notification. Late subscribers of
//!    a terminated subject receive only that terminal notification.
//!
//! # Failure Modes
//!
//! - A panicking subscriber aborts the current drain. The drain flag is reset
//!   by a guard; undelivered notifications stay queued and go out with the
//!   next emission.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::error::ReactiveError;
use crate::observable::{Notification, Observable, Sink, Value};
use crate::subscription::Subscription;
use crate::sync::lock;

struct Delivery<T> {
    targets: Vec<Sink<T>>,
    notification: Notification<T>,
}

struct SubjectState<T> {
    observers: Vec<(u64, Sink<T>)>,
    next_observer: u64,
    replay: bool,
    latest: Option<T>,
    terminal: Option<Notification<T>>,
    queue: VecDeque<Delivery<T>>,
    draining: bool,
}

/// A hot, multicast source of notifications.
pub struct Subject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Subject")
            .field("observers", &state.observers.len())
            .field("replay", &state.replay)
            .field("queued", &state.queue.len())
            .field("terminated", &state.terminal.is_some())
            .finish()
    }
}

impl<T: Value> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> Subject<T> {
    fn with_state(replay: bool, latest: Option<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                observers: Vec::new(),
                next_observer: 0,
                replay,
                latest,
                terminal: None,
                queue: VecDeque::new(),
                draining: false,
            })),
        }
    }

    /// A subject that forwards only notifications emitted after subscription.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(false, None)
    }

    /// A subject that replays its latest value to each new subscriber.
    #[must_use]
    pub fn replaying(initial: T) -> Self {
        Self::with_state(true, Some(initial))
    }

    /// Emit a value.
    pub fn next(&self, value: T) {
        self.enqueue(Notification::Next(value));
        self.drain();
    }

    /// Terminate with an error.
    pub fn error(&self, error: ReactiveError) {
        self.enqueue(Notification::Error(error));
        self.drain();
    }

    /// Terminate successfully.
    pub fn complete(&self) {
        self.enqueue(Notification::Complete);
        self.drain();
    }

    /// Queue a notification for every current observer without delivering it.
    ///
    /// Notifications after a terminal one are ignored. Call
    /// [`drain`](Self::drain) afterwards, outside any lock of your own.
    pub fn enqueue(&self, notification: Notification<T>) {
        let mut state = lock(&self.state);
        if state.terminal.is_some() {
            return;
        }
        match &notification {
            Notification::Next(value) => {
                if state.replay {
                    state.latest = Some(value.clone());
                }
            }
            terminal => {
                state.terminal = Some(terminal.clone());
                state.latest = None;
            }
        }
        let targets: Vec<Sink<T>> = if notification.is_terminal() {
            state.observers.drain(..).map(|(_, sink)| sink).collect()
        } else {
            state.observers.iter().map(|(_, sink)| sink.clone()).collect()
        };
        if !targets.is_empty() {
            state.queue.push_back(Delivery {
                targets,
                notification,
            });
        }
    }

    /// Deliver queued notifications unless another call is already doing so.
    pub fn drain(&self) {
        {
            let mut state = lock(&self.state);
            if state.draining || state.queue.is_empty() {
                return;
            }
            state.draining = true;
        }
        let mut guard = DrainGuard {
            state: &self.state,
            armed: true,
        };
        loop {
            let delivery = {
                let mut state = lock(&self.state);
                match state.queue.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        state.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            #[cfg(feature = "trace-delivery")]
            tracing::trace!(
                targets = delivery.targets.len(),
                terminal = delivery.notification.is_terminal(),
                "subject delivery"
            );
            for sink in &delivery.targets {
                sink.notify(delivery.notification.clone());
            }
        }
    }

    /// Register `sink` and queue `replay` for it alone, without draining.
    ///
    /// On a terminated subject the terminal notification is queued instead and
    /// nothing is registered.
    pub fn attach(&self, sink: Sink<T>, replay: Option<T>) -> Subscription {
        self.register(sink, |_| replay)
    }

    /// Register `sink`, replaying the latest value if this subject replays.
    ///
    /// The replay value is read under the lock that registers the sink, so an
    /// emission from another thread is either the replayed value or queued
    /// for the new sink.
    pub fn observe_sink(&self, sink: Sink<T>) -> Subscription {
        let subscription = self.register(sink, |state| {
            if state.replay { state.latest.clone() } else { None }
        });
        self.drain();
        subscription
    }

    fn register(
        &self,
        sink: Sink<T>,
        replay: impl FnOnce(&SubjectState<T>) -> Option<T>,
    ) -> Subscription {
        let mut state = lock(&self.state);
        if let Some(terminal) = state.terminal.clone() {
            state.queue.push_back(Delivery {
                targets: vec![sink],
                notification: terminal,
            });
            return Subscription::empty();
        }
        let id = state.next_observer;
        state.next_observer += 1;
        state.observers.push((id, sink.clone()));
        if let Some(value) = replay(&state) {
            state.queue.push_back(Delivery {
                targets: vec![sink],
                notification: Notification::Next(value),
            });
        }
        #[cfg(feature = "trace-delivery")]
        tracing::trace!(observer = id, observers = state.observers.len(), "subject attach");
        drop(state);

        let weak: Weak<Mutex<SubjectState<T>>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).observers.retain(|(slot, _)| *slot != id);
            }
        })
    }

    /// View this subject as an [`Observable`].
    #[must_use]
    pub fn as_observable(&self) -> Observable<T> {
        let subject = self.clone();
        Observable::create(move |sink| subject.observe_sink(sink))
    }

    /// The value a replaying subject would hand to a new subscriber.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        lock(&self.state).latest.clone()
    }

    /// Replace the replay value without notifying anyone.
    pub fn set_latest(&self, value: Option<T>) {
        let mut state = lock(&self.state);
        if state.terminal.is_none() {
            state.latest = value;
        }
    }

    /// Whether at least one observer is registered.
    #[must_use]
    pub fn has_observers(&self) -> bool {
        !lock(&self.state).observers.is_empty()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.state).observers.len()
    }

    /// Whether an error or completion has been emitted.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        lock(&self.state).terminal.is_some()
    }
}

struct DrainGuard<'a, T> {
    state: &'a Mutex<SubjectState<T>>,
    armed: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.state).draining = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
