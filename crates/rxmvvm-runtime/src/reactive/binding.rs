#![forbid(unsafe_code)]

//! Binding utilities connecting properties, streams and commands.
//!
//! A [`Binding<T>`] reads one or two properties through an optional
//! transform, for view code that pulls values. [`TwoWayBinding`] keeps two
//! properties in sync. [`BindingScope`] owns the subscriptions a view holds
//! and routes the errors nobody else would see to one handler.
//!
//! # Usage
//!
//! ```ignore
//! use rxmvvm_runtime::reactive::{BindingScope, Property, ReactiveProperty};
//!
//! let name = Property::with_value("Ada".to_string());
//! let greeting = bind_map!(name, |n| format!("Hello, {}", n.map_or("", String::as_str)));
//! assert_eq!(greeting.get(), "Hello, Ada");
//!
//! let mut scope = BindingScope::new();
//! let label = Property::new();
//! scope.bind_to(&name.as_observable(), &label);
//! ```
//!
//! # Invariants
//!
//! 1. `Binding::get()` reads the current value on every call (no caching).
//! 2. `TwoWayBinding` never writes a value the target already holds, which
//!    ends the echo from the other side.
//! 3. Dropping a scope or a `TwoWayBinding` releases every subscription it
//!    owns, in reverse registration order.
//!
//! # Failure Modes
//!
//! - Source stream errors and failed writes go to the scope's error handler.
//!   The default handler logs them at warn level.

use std::fmt;
use std::sync::Arc;

use rxmvvm_core::{Observable, ReactiveError, Subscription, Value};
use tracing::warn;

use super::property::ReactiveProperty;
use crate::command::Command;

// ---------------------------------------------------------------------------
// Binding<T>: one-way read binding
// ---------------------------------------------------------------------------

/// A read-only view of one or more properties, evaluated on each `get()`.
pub struct Binding<T> {
    eval: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Arc::clone(&self.eval),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("value", &self.get())
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    /// A binding that evaluates `f` on each `get()` call.
    pub fn new(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self { eval: Arc::new(f) }
    }

    /// Current bound value.
    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }

    /// Apply a further transform.
    pub fn then<U: 'static>(self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Binding<U> {
        Binding {
            eval: Arc::new(move || f((self.eval)())),
        }
    }
}

/// Bind directly to a property's value.
pub fn bind_property<T, P>(source: &P) -> Binding<Option<T>>
where
    T: Value,
    P: ReactiveProperty<T> + Clone + 'static,
{
    let src = source.clone();
    Binding {
        eval: Arc::new(move || src.value()),
    }
}

/// Bind to a property's value through `map`.
pub fn bind_mapped<S, P, T>(source: &P, map: impl Fn(Option<&S>) -> T + Send + Sync + 'static) -> Binding<T>
where
    S: Value,
    P: ReactiveProperty<S> + Clone + 'static,
    T: 'static,
{
    let src = source.clone();
    Binding {
        eval: Arc::new(move || map(src.value().as_ref())),
    }
}

/// Bind to two properties combined by `map`.
pub fn bind_mapped2<S1, P1, S2, P2, T>(
    first: &P1,
    second: &P2,
    map: impl Fn(Option<&S1>, Option<&S2>) -> T + Send + Sync + 'static,
) -> Binding<T>
where
    S1: Value,
    P1: ReactiveProperty<S1> + Clone + 'static,
    S2: Value,
    P2: ReactiveProperty<S2> + Clone + 'static,
    T: 'static,
{
    let src1 = first.clone();
    let src2 = second.clone();
    Binding {
        eval: Arc::new(move || map(src1.value().as_ref(), src2.value().as_ref())),
    }
}

// ---------------------------------------------------------------------------
// TwoWayBinding
// ---------------------------------------------------------------------------

/// Keeps two properties holding the same value.
///
/// On creation `b` takes `a`'s value (if any). Afterwards a publication on
/// either side is written to the other unless it already holds that value.
pub struct TwoWayBinding {
    _a_to_b: Subscription,
    _b_to_a: Subscription,
}

impl TwoWayBinding {
    /// Connect `a` and `b`. Failed writes are logged at warn level.
    pub fn new<T, A, B>(a: &A, b: &B) -> Self
    where
        T: Value + PartialEq,
        A: ReactiveProperty<T> + Clone + 'static,
        B: ReactiveProperty<T> + Clone + 'static,
    {
        Self::with_handler(a, b, default_error_handler())
    }

    /// Connect `a` and `b`, reporting failed writes to `on_error`.
    pub fn with_handler<T, A, B>(a: &A, b: &B, on_error: ErrorHandler) -> Self
    where
        T: Value + PartialEq,
        A: ReactiveProperty<T> + Clone + 'static,
        B: ReactiveProperty<T> + Clone + 'static,
    {
        let a_to_b = mirror(&a.as_observable(), b.clone(), Arc::clone(&on_error));
        let b_to_a = mirror(&b.as_observable(), a.clone(), on_error);
        Self {
            _a_to_b: a_to_b,
            _b_to_a: b_to_a,
        }
    }
}

fn mirror<T, P>(source: &Observable<T>, target: P, on_error: ErrorHandler) -> Subscription
where
    T: Value + PartialEq,
    P: ReactiveProperty<T> + 'static,
{
    let handler = Arc::clone(&on_error);
    source.subscribe_with(
        move |value| {
            if target.value().as_ref() == Some(&value) {
                return;
            }
            if let Err(error) = target.set_value(value) {
                on_error(&error);
            }
        },
        move |error| handler(&error),
    )
}

impl fmt::Debug for TwoWayBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWayBinding").finish()
    }
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

/// Create a direct [`Binding`] to a property.
///
/// # Examples
///
/// ```ignore
/// let count = Property::with_value(0);
/// let b = bind!(count);
/// assert_eq!(b.get(), Some(0));
/// ```
#[macro_export]
macro_rules! bind {
    ($property:expr) => {
        $crate::reactive::binding::bind_property(&$property)
    };
}

/// Create a mapped [`Binding`] from a property.
///
/// # Examples
///
/// ```ignore
/// let count = Property::with_value(2);
/// let label = bind_map!(count, |c| format!("{} items", c.copied().unwrap_or(0)));
/// assert_eq!(label.get(), "2 items");
/// ```
#[macro_export]
macro_rules! bind_map {
    ($property:expr, $f:expr) => {
        $crate::reactive::binding::bind_mapped(&$property, $f)
    };
}

/// Create a mapped [`Binding`] from two properties.
#[macro_export]
macro_rules! bind_map2 {
    ($first:expr, $second:expr, $f:expr) => {
        $crate::reactive::binding::bind_mapped2(&$first, &$second, $f)
    };
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Receives errors that have no stream of their own to travel on.
pub type ErrorHandler = Arc<dyn Fn(&ReactiveError) + Send + Sync>;

/// The handler used when none is supplied: log at warn level.
#[must_use]
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|error: &ReactiveError| {
        warn!(%error, kind = ?error.kind(), "unhandled binding error");
    })
}

/// Collects the subscriptions of a logical scope (e.g. one view).
///
/// # Invariants
///
/// 1. Subscriptions are released in reverse registration order on drop.
/// 2. After drop or `clear()`, no callback registered through this scope runs.
/// 3. `binding_count()` is the number of subscriptions currently held.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
    on_error: ErrorHandler,
}

impl BindingScope {
    /// An empty scope using [`default_error_handler`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_error_handler(default_error_handler())
    }

    /// An empty scope reporting errors to `on_error`.
    #[must_use]
    pub fn with_error_handler(on_error: ErrorHandler) -> Self {
        Self {
            subscriptions: Vec::new(),
            on_error,
        }
    }

    /// Keep `sub` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Run `callback` for every value of `source`. Errors go to the handler.
    pub fn subscribe<T: Value>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> &mut Self {
        let on_error = Arc::clone(&self.on_error);
        let sub = source.subscribe_with(callback, move |error| on_error(&error));
        self.subscriptions.push(sub);
        self
    }

    /// Write every value of `source` into `target`.
    pub fn bind_to<T, P>(&mut self, source: &Observable<T>, target: &P) -> &mut Self
    where
        T: Value,
        P: ReactiveProperty<T> + Clone + 'static,
    {
        let target = target.clone();
        self.when(source, move |value| target.set_value(value))
    }

    /// Run a fallible `action` for every value of `source`.
    pub fn when<T: Value>(
        &mut self,
        source: &Observable<T>,
        action: impl Fn(T) -> Result<(), ReactiveError> + Send + Sync + 'static,
    ) -> &mut Self {
        let on_value_error = Arc::clone(&self.on_error);
        let on_stream_error = Arc::clone(&self.on_error);
        let sub = source.subscribe_with(
            move |value| {
                if let Err(error) = action(value) {
                    on_value_error(&error);
                }
            },
            move |error| on_stream_error(&error),
        );
        self.subscriptions.push(sub);
        self
    }

    /// Execute `command` with every value of `source`.
    ///
    /// The command reports its own outcome on its result and error streams,
    /// so the `execute` stream itself is released right away.
    pub fn when_execute<T: Value, R: Value>(
        &mut self,
        source: &Observable<T>,
        command: &Command<T, R>,
    ) -> &mut Self {
        let command = command.clone();
        self.when(source, move |value| {
            drop(command.execute_with(value).subscribe(|_| {}));
            Ok(())
        })
    }

    /// Create a binding to `source`. Bindings hold no subscription.
    pub fn bind<T, P>(&mut self, source: &P) -> Binding<Option<T>>
    where
        T: Value,
        P: ReactiveProperty<T> + Clone + 'static,
    {
        bind_property(source)
    }

    /// Number of subscriptions held.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now. The scope stays usable.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ReactiveFactory;
    use crate::reactive::Property;
    use rxmvvm_core::{ErrorKind, Subject};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    fn collecting_handler() -> (Arc<Mutex<Vec<ErrorKind>>>, ErrorHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let handler: ErrorHandler =
            Arc::new(move |error: &ReactiveError| s.lock().unwrap().push(error.kind()));
        (seen, handler)
    }

    #[test]
    fn binding_reads_current_value() {
        let property = Property::with_value(42);
        let b = bind_property(&property);
        assert_eq!(b.get(), Some(42));
        property.set_value(100).unwrap();
        assert_eq!(b.get(), Some(100));
    }

    #[test]
    fn binding_map_and_then() {
        let count = Property::with_value(3);
        let label = bind_mapped(&count, |c: Option<&i32>| format!("items: {}", c.copied().unwrap_or(0)));
        assert_eq!(label.get(), "items: 3");
        let doubled = bind_property(&count).then(|c| c.unwrap_or(0) * 2);
        count.set_value(7).unwrap();
        assert_eq!(label.get(), "items: 7");
        assert_eq!(doubled.get(), 14);
    }

    #[test]
    fn binding_map2() {
        let w = Property::with_value(10);
        let h: Property<i32> = Property::new();
        let area = bind_mapped2(&w, &h, |a: Option<&i32>, b: Option<&i32>| {
            a.zip(b).map(|(a, b)| a * b)
        });
        assert_eq!(area.get(), None);
        h.set_value(20).unwrap();
        assert_eq!(area.get(), Some(200));
    }

    #[test]
    fn macros_expand() {
        let a = Property::with_value(3);
        let b = Property::with_value(4);
        assert_eq!(bind!(a).get(), Some(3));
        assert_eq!(bind_map!(a, |v: Option<&i32>| v.copied().unwrap_or(0) * 10).get(), 30);
        let sum = bind_map2!(a, b, |x: Option<&i32>, y: Option<&i32>| {
            x.copied().unwrap_or(0) + y.copied().unwrap_or(0)
        });
        assert_eq!(sum.get(), 7);
    }

    #[test]
    fn two_way_syncs_both_directions() {
        let a = Property::with_value(10);
        let b = Property::with_value(0);
        let _binding = TwoWayBinding::new(&a, &b);
        assert_eq!(b.value(), Some(10));

        a.set_value(42).unwrap();
        assert_eq!(b.value(), Some(42));
        b.set_value(99).unwrap();
        assert_eq!(a.value(), Some(99));
    }

    #[test]
    fn two_way_drop_disconnects() {
        let a = Property::with_value(1);
        let b = Property::with_value(0);
        let binding = TwoWayBinding::new(&a, &b);
        drop(binding);
        a.set_value(5).unwrap();
        assert_eq!(b.value(), Some(1));
    }

    #[test]
    fn two_way_reports_read_only_target() {
        let source = Property::with_value(1);
        let mirror = Property::from_property(&source);
        let other = Property::with_value(2);
        let (seen, handler) = collecting_handler();
        let _binding = TwoWayBinding::with_handler(&other, &mirror, handler);
        assert_eq!(*seen.lock().unwrap(), vec![ErrorKind::ReadOnlyProperty]);
    }

    #[test]
    fn scope_bind_to_writes_target() {
        let source = Subject::new();
        let target = Property::new();
        let mut scope = BindingScope::new();
        scope.bind_to(&source.as_observable(), &target);
        source.next("hello".to_string());
        assert_eq!(target.value().as_deref(), Some("hello"));
        assert_eq!(scope.binding_count(), 1);
    }

    #[test]
    fn scope_routes_errors_to_handler() {
        let (seen, handler) = collecting_handler();
        let mut scope = BindingScope::with_error_handler(handler);
        let source = Subject::new();
        scope.when(&source.as_observable(), |v: i32| {
            if v < 0 {
                Err(ReactiveError::illegal_argument("negative"))
            } else {
                Ok(())
            }
        });
        source.next(1);
        source.next(-1);
        source.error(ReactiveError::NoResult);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ErrorKind::IllegalArgument, ErrorKind::NoResult]
        );
    }

    #[test]
    #[traced_test]
    fn default_handler_logs_errors() {
        let mut scope = BindingScope::new();
        let source: Subject<i32> = Subject::new();
        scope.subscribe(&source.as_observable(), |_| {});
        source.error(ReactiveError::message("lost connection"));
        assert!(logs_contain("unhandled binding error"));
        assert!(logs_contain("lost connection"));
    }

    #[test]
    fn scope_when_execute_runs_command() {
        let factory = ReactiveFactory::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let command = factory
            .command()
            .from_consumer(move |v: u8| s.lock().unwrap().push(v));
        let clicks = Subject::new();
        let mut scope = BindingScope::new();
        scope.when_execute(&clicks.as_observable(), &command);
        clicks.next(1);
        clicks.next(2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn clear_releases_everything() {
        let source = Subject::new();
        let hits = Arc::new(Mutex::new(0));
        let mut scope = BindingScope::new();
        let h = Arc::clone(&hits);
        scope
            .subscribe(&source.as_observable(), move |_: i32| *h.lock().unwrap() += 1)
            .subscribe(&source.as_observable(), |_| {});
        assert_eq!(scope.binding_count(), 2);
        scope.clear();
        assert!(scope.is_empty());
        source.next(1);
        assert_eq!(*hits.lock().unwrap(), 0);
        assert!(!source.has_observers());
    }
}
