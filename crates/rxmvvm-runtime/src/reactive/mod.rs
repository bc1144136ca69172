#![forbid(unsafe_code)]

//! Reactive properties and bindings.
//!
//! - [`Property`]: a thread-safe value cell publishing every write to its
//!   subscribers, with suppress and delay gates.
//! - [`ReactiveProperty`]: the capability set shared by properties and their
//!   decorators.
//! - [`UiProperty`]: a decorator routing writes through a [`Scheduler`].
//! - [`GateGuard`]: RAII token for a suppress or delay acquisition.
//! - [`Binding`], [`TwoWayBinding`], [`BindingScope`]: glue between
//!   properties, streams and commands.
//!
//! # Architecture
//!
//! A property stores its value in an `ArcSwapOption`, so reads never block,
//! and publishes through a [`Subject`](rxmvvm_core::Subject). The gate
//! counters and the publication queue are updated under one lock, so the
//! order of publications matches the order of writes.
//!
//! # Invariants
//!
//! 1. A new subscriber receives the current value (if any) before any later
//!    publication.
//! 2. While suppressed, writes update the value but publish nothing.
//! 3. While delayed, only the most recent write is published, once, when the
//!    last delay guard is released.
//! 4. Read-only properties reject writes with
//!    [`ReactiveError::ReadOnlyProperty`](rxmvvm_core::ReactiveError::ReadOnlyProperty).
//!
//! [`Scheduler`]: rxmvvm_core::Scheduler

pub mod binding;
pub mod gate;
pub mod property;
pub mod ui;

pub use binding::{
    Binding, BindingScope, ErrorHandler, TwoWayBinding, bind_mapped, bind_mapped2, bind_property,
    default_error_handler,
};
pub use gate::{GateGuard, GateKind};
pub use property::{Property, ReactiveProperty};
pub use ui::UiProperty;
