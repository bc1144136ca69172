#![forbid(unsafe_code)]

//! Property decorator that routes writes through a UI access function.
//!
//! [`UiProperty`] forwards every read, stream and gate operation to the
//! wrapped property and interposes only on writes ([`set_value`] and
//! [`update_value`]): the read-only check happens on the caller's thread,
//! the write itself is scheduled on the supplied access scheduler
//! (typically the host's UI thread). An update reads the current value when
//! it runs, not when it is requested.
//!
//! Each decoration produces a new wrapper. Compare wrappers through
//! [`UiProperty::inner`] when identity matters.
//!
//! [`set_value`]: ReactiveProperty::set_value
//! [`update_value`]: ReactiveProperty::update_value

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use rxmvvm_core::{Observable, PropertyId, ReactiveError, Scheduler, Value};
use tracing::warn;

use super::gate::GateGuard;
use super::property::ReactiveProperty;

/// A property whose writes run on a caller-supplied scheduler.
pub struct UiProperty<T, P> {
    inner: P,
    access: Arc<dyn Scheduler>,
    _value: PhantomData<fn() -> T>,
}

impl<T, P: Clone> Clone for UiProperty<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            access: Arc::clone(&self.access),
            _value: PhantomData,
        }
    }
}

impl<T, P: fmt::Debug> fmt::Debug for UiProperty<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiProperty")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<T: Value, P: ReactiveProperty<T> + Clone + 'static> UiProperty<T, P> {
    /// Decorate `inner` so that writes go through `access`.
    pub fn new(access: Arc<dyn Scheduler>, inner: P) -> Self {
        Self {
            inner,
            access,
            _value: PhantomData,
        }
    }

    /// The decorated property.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<T: Value, P: ReactiveProperty<T> + Clone + 'static> ReactiveProperty<T> for UiProperty<T, P> {
    fn id(&self) -> PropertyId {
        self.inner.id()
    }

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn value(&self) -> Option<T> {
        self.inner.value()
    }

    fn set_value(&self, value: T) -> Result<(), ReactiveError> {
        if self.inner.is_read_only() {
            return Err(ReactiveError::ReadOnlyProperty {
                property: self.inner.id(),
            });
        }
        let target = self.inner.clone();
        self.access.schedule(Box::new(move || {
            if let Err(error) = target.set_value(value) {
                warn!(property = %target.id(), %error, "scheduled property write failed");
            }
        }));
        Ok(())
    }

    fn update_value<F>(&self, update: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(Option<T>) -> T + Send + 'static,
    {
        if self.inner.is_read_only() {
            return Err(ReactiveError::ReadOnlyProperty {
                property: self.inner.id(),
            });
        }
        let target = self.inner.clone();
        self.access.schedule(Box::new(move || {
            if let Err(error) = target.update_value(update) {
                warn!(property = %target.id(), %error, "scheduled property update failed");
            }
        }));
        Ok(())
    }

    fn as_observable(&self) -> Observable<T> {
        self.inner.as_observable()
    }

    fn is_suppressed(&self) -> bool {
        self.inner.is_suppressed()
    }

    fn suppress(&self) -> GateGuard {
        self.inner.suppress()
    }

    fn is_delayed(&self) -> bool {
        self.inner.is_delayed()
    }

    fn delay(&self) -> GateGuard {
        self.inner.delay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Property;
    use rxmvvm_core::{ErrorKind, QueueScheduler};
    use rxmvvm_harness::TestObserver;

    #[test]
    fn writes_wait_for_the_access_scheduler() {
        let ui = QueueScheduler::new();
        let property = UiProperty::new(Arc::new(ui.clone()), Property::with_value(0));
        let observer = TestObserver::new(&property.as_observable());

        property.set_value(1).unwrap();
        assert_eq!(property.value(), Some(0));
        assert_eq!(ui.pending(), 1);

        ui.run_pending();
        assert_eq!(property.value(), Some(1));
        assert_eq!(observer.values(), vec![0, 1]);
    }

    #[test]
    fn queued_updates_compose() {
        let ui = QueueScheduler::new();
        let property = UiProperty::new(Arc::new(ui.clone()), Property::with_value(0));
        property.update_value(|v| v.unwrap_or(0) + 1).unwrap();
        property.update_value(|v| v.unwrap_or(0) + 1).unwrap();
        assert_eq!(property.value(), Some(0));

        ui.run_pending();
        assert_eq!(property.value(), Some(2));
    }

    #[test]
    fn read_only_update_rejected_synchronously() {
        let ui = QueueScheduler::new();
        let mirror = Property::from_property(&Property::with_value(1));
        let property = UiProperty::new(Arc::new(ui.clone()), mirror);
        let err = property.update_value(|v| v.unwrap_or(0) + 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyProperty);
        assert_eq!(ui.pending(), 0);
    }

    #[test]
    fn read_only_rejected_synchronously() {
        let ui = QueueScheduler::new();
        let source = Property::with_value(1);
        let mirror = Property::from_property(&source);
        let property = UiProperty::new(Arc::new(ui.clone()), mirror);
        let err = property.set_value(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyProperty);
        assert_eq!(ui.pending(), 0);
    }

    #[test]
    fn gates_apply_to_the_inner_property() {
        let base = Property::with_value(0);
        let property = UiProperty::new(Arc::new(rxmvvm_core::ImmediateScheduler), base.clone());
        let observer = TestObserver::new(&base.as_observable());
        let guard = property.suppress();
        assert!(base.is_suppressed());
        property.set_value(3).unwrap();
        drop(guard);
        assert_eq!(observer.values(), vec![0]);
        assert_eq!(base.value(), Some(3));
    }

    #[test]
    fn wrappers_share_the_decorated_cell() {
        let base = Property::with_value(0);
        let first = UiProperty::new(Arc::new(rxmvvm_core::ImmediateScheduler), base.clone());
        let second = UiProperty::new(Arc::new(rxmvvm_core::ImmediateScheduler), base.clone());
        assert!(first.inner().ptr_eq(second.inner()));
        assert_eq!(first.id(), second.id());
    }
}
