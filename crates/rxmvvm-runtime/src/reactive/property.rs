#![forbid(unsafe_code)]

//! Observable property cells with suppress and delay gates.
//!
//! A [`Property<T>`] stores an optional current value and publishes every
//! write to the subscribers of [`ReactiveProperty::as_observable`]. Two
//! independent gates shape publication:
//!
//! - **suppress**: while held, writes update the stored value and publish
//!   nothing, not even when a delay is released later.
//! - **delay**: while held, writes update the stored value and the latest
//!   one is buffered; it is published once when the last delay level is
//!   released.
//!
//! # Invariants
//!
//! 1. `has_value()` is true exactly when `value()` is `Some`.
//! 2. Every subscriber observes publications in one total order per property.
//! 3. A property created from a stream is read-only; when the stream ends or
//!    fails, the value becomes absent and the terminal signal is forwarded.
//! 4. Publication happens after the property's gate lock is released.
//!
//! # Failure Modes
//!
//! - Writing a read-only property returns [`ReactiveError::ReadOnlyProperty`]
//!   and leaves the value untouched.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwapOption;
use rxmvvm_core::sync::lock;
use rxmvvm_core::{
    Notification, Observable, PropertyId, ReactiveError, Sink, Subject, Subscription, Value,
};
use tracing::trace;

use super::gate::{GateGuard, GateKind};

/// The contract shared by every property flavour.
pub trait ReactiveProperty<T: Value>: Send + Sync {
    /// Identity of the property, used in errors and creation hooks.
    fn id(&self) -> PropertyId;

    /// Whether a value is present.
    fn has_value(&self) -> bool;

    /// Whether writes are rejected.
    fn is_read_only(&self) -> bool;

    /// The current value.
    fn value(&self) -> Option<T>;

    /// Store `value` and publish it subject to the gates.
    fn set_value(&self, value: T) -> Result<(), ReactiveError>;

    /// Replace the value with `update(current)`.
    ///
    /// Implementations that defer writes apply `update` when the write runs,
    /// so consecutive updates compose.
    fn update_value<F>(&self, update: F) -> Result<(), ReactiveError>
    where
        Self: Sized,
        F: FnOnce(Option<T>) -> T + Send + 'static,
    {
        if self.is_read_only() {
            return Err(ReactiveError::ReadOnlyProperty {
                property: self.id(),
            });
        }
        self.set_value(update(self.value()))
    }

    /// Stream of the current value (if any) followed by every publication.
    fn as_observable(&self) -> Observable<T>;

    /// Whether at least one suppress level is held.
    fn is_suppressed(&self) -> bool;

    /// Acquire a suppress level.
    fn suppress(&self) -> GateGuard;

    /// Whether at least one delay level is held.
    fn is_delayed(&self) -> bool;

    /// Acquire a delay level.
    fn delay(&self) -> GateGuard;
}

// ---------------------------------------------------------------------------
// Property<T>
// ---------------------------------------------------------------------------

struct GateState<T> {
    suppressed: usize,
    delayed: usize,
    pending: Option<T>,
}

struct PropertyInner<T> {
    id: PropertyId,
    read_only: bool,
    value: ArcSwapOption<T>,
    subject: Subject<T>,
    gate: Mutex<GateState<T>>,
    upstream: Mutex<Option<Subscription>>,
}

impl<T: Value> PropertyInner<T> {
    fn new(read_only: bool, initial: Option<T>) -> Self {
        Self {
            id: PropertyId::next(),
            read_only,
            value: ArcSwapOption::from(initial.map(Arc::new)),
            subject: Subject::new(),
            gate: Mutex::new(GateState {
                suppressed: 0,
                delayed: 0,
                pending: None,
            }),
            upstream: Mutex::new(None),
        }
    }

    fn publish(&self, value: T) {
        {
            let mut gate = lock(&self.gate);
            if self.subject.is_terminated() {
                return;
            }
            self.value.store(Some(Arc::new(value.clone())));
            if gate.suppressed == 0 {
                if gate.delayed > 0 {
                    gate.pending = Some(value);
                } else {
                    self.subject.enqueue(Notification::Next(value));
                }
            }
        }
        self.subject.drain();
    }

    fn terminate(&self, terminal: Notification<T>) {
        {
            let mut gate = lock(&self.gate);
            self.value.store(None);
            gate.pending = None;
            self.subject.enqueue(terminal);
        }
        self.subject.drain();
        trace!(property = %self.id, "property source terminated");
    }

    fn observe(&self, sink: Sink<T>) -> Subscription {
        let subscription = {
            let _gate = lock(&self.gate);
            let current = self.value.load_full().map(|value| (*value).clone());
            self.subject.attach(sink, current)
        };
        self.subject.drain();
        subscription
    }

    fn release_suppress(&self) {
        let mut gate = lock(&self.gate);
        gate.suppressed = gate.suppressed.saturating_sub(1);
    }

    fn release_delay(&self) {
        {
            let mut gate = lock(&self.gate);
            gate.delayed = gate.delayed.saturating_sub(1);
            if gate.delayed > 0 {
                return;
            }
            if let Some(value) = gate.pending.take() {
                self.subject.enqueue(Notification::Next(value));
            }
        }
        self.subject.drain();
    }
}

/// A thread-safe, observable value cell.
///
/// Cloning shares the cell.
pub struct Property<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gate = lock(&self.inner.gate);
        f.debug_struct("Property")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.load_full())
            .field("read_only", &self.inner.read_only)
            .field("suppressed", &gate.suppressed)
            .field("delayed", &gate.delayed)
            .finish()
    }
}

impl<T: Value> Default for Property<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> Property<T> {
    fn from_inner(inner: PropertyInner<T>) -> Self {
        trace!(property = %inner.id, read_only = inner.read_only, "property created");
        Self {
            inner: Arc::new(inner),
        }
    }

    /// An empty, writable property.
    #[must_use]
    pub fn new() -> Self {
        Self::from_inner(PropertyInner::new(false, None))
    }

    /// A writable property holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self::from_inner(PropertyInner::new(false, Some(value)))
    }

    /// A read-only property that follows `source`.
    ///
    /// The property holds its upstream subscription; dropping the last
    /// handle to the property releases it.
    pub fn from_observable(source: &Observable<T>) -> Self {
        let property = Self::from_inner(PropertyInner::new(true, None));
        let weak: Weak<PropertyInner<T>> = Arc::downgrade(&property.inner);
        let subscription = source.observe(move |notification| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match notification {
                Notification::Next(value) => inner.publish(value),
                terminal => inner.terminate(terminal),
            }
        });
        *lock(&property.inner.upstream) = Some(subscription);
        property
    }

    /// A read-only mirror of another property.
    pub fn from_property(source: &impl ReactiveProperty<T>) -> Self {
        Self::from_observable(&source.as_observable())
    }

    /// A read-only property holding `combine(a, b)` over the latest values
    /// of two properties. Absent until both have a value.
    pub fn combine<A: Value, B: Value>(
        first: &impl ReactiveProperty<A>,
        second: &impl ReactiveProperty<B>,
        combine: impl Fn(&A, &B) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::from_observable(&Observable::combine_latest2(
            &first.as_observable(),
            &second.as_observable(),
            combine,
        ))
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of subscribers currently attached.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subject.observer_count()
    }
}

impl<T: Value> ReactiveProperty<T> for Property<T> {
    fn id(&self) -> PropertyId {
        self.inner.id
    }

    fn has_value(&self) -> bool {
        self.inner.value.load().is_some()
    }

    fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    fn value(&self) -> Option<T> {
        self.inner.value.load_full().map(|value| (*value).clone())
    }

    fn set_value(&self, value: T) -> Result<(), ReactiveError> {
        if self.inner.read_only {
            return Err(ReactiveError::ReadOnlyProperty {
                property: self.inner.id,
            });
        }
        self.inner.publish(value);
        Ok(())
    }

    fn as_observable(&self) -> Observable<T> {
        let inner = Arc::clone(&self.inner);
        Observable::create(move |sink| inner.observe(sink))
    }

    fn is_suppressed(&self) -> bool {
        lock(&self.inner.gate).suppressed > 0
    }

    fn suppress(&self) -> GateGuard {
        lock(&self.inner.gate).suppressed += 1;
        let weak = Arc::downgrade(&self.inner);
        GateGuard::new(GateKind::Suppress, move || {
            if let Some(inner) = weak.upgrade() {
                inner.release_suppress();
            }
        })
    }

    fn is_delayed(&self) -> bool {
        lock(&self.inner.gate).delayed > 0
    }

    fn delay(&self) -> GateGuard {
        lock(&self.inner.gate).delayed += 1;
        let weak = Arc::downgrade(&self.inner);
        GateGuard::new(GateKind::Delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.release_delay();
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
