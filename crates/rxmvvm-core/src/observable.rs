#![forbid(unsafe_code)]

//! Cold observable streams.
//!
//! An [`Observable<T>`] is a recipe: every call to [`Observable::observe`]
//! runs the stream's subscribe function with a fresh [`Sink`] and returns the
//! [`Subscription`] that tears it down. Hot sources (see
//! [`Subject`](crate::Subject)) are exposed through the same type, so
//! consumers never care which kind they hold.
//!
//! # Invariants
//!
//! 1. At most one terminal notification (`Error` or `Complete`) reaches a sink,
//!    and nothing follows it.
//! 2. Dropping the subscription closes the sink before the upstream is
//!    released; late emissions are discarded.
//!
//! # Failure Modes
//!
//! - A subscriber callback that panics unwinds into the emitting call. Subject
//!   delivery state is restored by a drop guard, so the subject stays usable.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ReactiveError;
use crate::subscription::Subscription;

/// Values that can travel on a stream.
///
/// Blanket-implemented for every `Clone + Send + Sync + 'static` type.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// A single event on a stream.
#[derive(Debug, Clone)]
pub enum Notification<T> {
    /// A value.
    Next(T),
    /// Terminal failure.
    Error(ReactiveError),
    /// Terminal success.
    Complete,
}

impl<T> Notification<T> {
    /// Whether this notification ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

// ---------------------------------------------------------------------------
// Sink<T>
// ---------------------------------------------------------------------------

type Downstream<T> = dyn Fn(Notification<T>) + Send + Sync;

struct SinkInner<T> {
    downstream: Box<Downstream<T>>,
    closed: AtomicBool,
}

/// The emitting end handed to a stream's subscribe function.
///
/// Cloning a sink shares it: closing one clone closes all of them.
pub struct Sink<T> {
    inner: Arc<SinkInner<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Sink<T> {
    /// Close the sink silently. Further notifications are dropped.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    /// Whether the sink accepts further notifications.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Whether two handles share the same sink.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Value> Sink<T> {
    /// Create a sink forwarding to `downstream`.
    pub fn new(downstream: impl Fn(Notification<T>) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                downstream: Box::new(downstream),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Emit a value unless the sink is closed.
    pub fn next(&self, value: T) {
        if !self.is_closed() {
            (self.inner.downstream)(Notification::Next(value));
        }
    }

    /// Emit a terminal error and close the sink.
    pub fn error(&self, error: ReactiveError) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            (self.inner.downstream)(Notification::Error(error));
        }
    }

    /// Emit completion and close the sink.
    pub fn complete(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            (self.inner.downstream)(Notification::Complete);
        }
    }

    /// Dispatch a notification to the matching method.
    pub fn notify(&self, notification: Notification<T>) {
        match notification {
            Notification::Next(value) => self.next(value),
            Notification::Error(error) => self.error(error),
            Notification::Complete => self.complete(),
        }
    }
}

// ---------------------------------------------------------------------------
// Observable<T>
// ---------------------------------------------------------------------------

type SubscribeFn<T> = dyn Fn(Sink<T>) -> Subscription + Send + Sync;

/// A stream of values with optional terminal completion or error.
pub struct Observable<T> {
    on_subscribe: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: Arc::clone(&self.on_subscribe),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Value> Observable<T> {
    /// Create a stream from its subscribe function.
    ///
    /// The function runs once per subscriber and returns the subscription
    /// that releases whatever it registered.
    pub fn create(
        on_subscribe: impl Fn(Sink<T>) -> Subscription + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_subscribe: Arc::new(on_subscribe),
        }
    }

    /// A stream that emits `value` and completes.
    pub fn just(value: T) -> Self {
        Self::create(move |sink| {
            sink.next(value.clone());
            sink.complete();
            Subscription::empty()
        })
    }

    /// A stream that emits every item of `items` in order, then completes.
    pub fn from_values(items: impl IntoIterator<Item = T>) -> Self {
        let items: Arc<[T]> = items.into_iter().collect();
        Self::create(move |sink| {
            for item in items.iter() {
                if sink.is_closed() {
                    break;
                }
                sink.next(item.clone());
            }
            sink.complete();
            Subscription::empty()
        })
    }

    /// A stream that completes immediately.
    pub fn empty() -> Self {
        Self::create(|sink| {
            sink.complete();
            Subscription::empty()
        })
    }

    /// A stream that never emits.
    pub fn never() -> Self {
        Self::create(|_| Subscription::empty())
    }

    /// A stream that fails immediately with `error`.
    pub fn failed(error: ReactiveError) -> Self {
        Self::create(move |sink| {
            sink.error(error.clone());
            Subscription::empty()
        })
    }

    /// A stream built lazily, once per subscriber.
    pub fn defer(factory: impl Fn() -> Observable<T> + Send + Sync + 'static) -> Self {
        Self::create(move |sink| factory().subscribe_sink(sink))
    }

    /// Subscribe an existing sink. Used by operators.
    pub fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        let upstream = (self.on_subscribe)(sink.clone());
        Subscription::new(move || {
            sink.close();
            drop(upstream);
        })
    }

    /// Subscribe with a callback receiving every notification.
    pub fn observe(
        &self,
        observer: impl Fn(Notification<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_sink(Sink::new(observer))
    }

    /// Subscribe to values only. Errors and completion are ignored.
    pub fn subscribe(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        self.observe(move |notification| {
            if let Notification::Next(value) = notification {
                on_next(value);
            }
        })
    }

    /// Subscribe to values and errors.
    pub fn subscribe_with(
        &self,
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(ReactiveError) + Send + Sync + 'static,
    ) -> Subscription {
        self.observe(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(error) => on_error(error),
            Notification::Complete => {}
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn record<T: Value>(source: &Observable<T>) -> (Arc<Mutex<Vec<Notification<T>>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        let sub = source.observe(move |n| e.lock().unwrap().push(n));
        (events, sub)
    }

    #[test]
    fn just_emits_then_completes() {
        let (events, _sub) = record(&Observable::just(5));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Notification::Next(5)));
        assert!(matches!(events[1], Notification::Complete));
    }

    #[test]
    fn from_values_preserves_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = Observable::from_values(vec![1, 2, 3]).subscribe(move |v| s.lock().unwrap().push(v));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn sink_drops_after_terminal() {
        let source = Observable::create(|sink: Sink<i32>| {
            sink.next(1);
            sink.complete();
            sink.next(2);
            sink.error(ReactiveError::NoResult);
            Subscription::empty()
        });
        let (events, _sub) = record(&source);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[test]
    fn dispose_closes_sink() {
        let captured: Arc<Mutex<Option<Sink<i32>>>> = Arc::new(Mutex::new(None));
        let c = Arc::clone(&captured);
        let source = Observable::create(move |sink| {
            *c.lock().unwrap() = Some(sink);
            Subscription::empty()
        });
        let (events, sub) = record(&source);
        drop(sub);
        let sink = captured.lock().unwrap().clone().unwrap();
        assert!(sink.is_closed());
        sink.next(1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn defer_runs_per_subscriber() {
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        let source = Observable::defer(move || {
            *c.lock().unwrap() += 1;
            Observable::just(1)
        });
        let _a = source.subscribe(|_| {});
        let _b = source.subscribe(|_| {});
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn failed_reports_error() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        let _sub = Observable::<i32>::failed(ReactiveError::NoResult)
            .subscribe_with(|_| {}, move |err| e.lock().unwrap().push(err.kind()));
        assert_eq!(*errors.lock().unwrap(), vec![crate::ErrorKind::NoResult]);
    }
}
