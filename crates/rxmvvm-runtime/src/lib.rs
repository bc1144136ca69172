#![forbid(unsafe_code)]

//! View-model runtime for rxmvvm.
//!
//! Builds on the stream primitives of [`rxmvvm_core`]:
//!
//! - [`reactive`]: properties with suppress and delay gates, UI-thread
//!   decorators and bindings.
//! - [`command`]: gated commands with status streams, progress reporting and
//!   composition.
//! - [`interaction`]: request/response handshakes with the view.
//! - [`factory`]: the construction surface, with creation hooks and
//!   configurable default scheduling.
//! - [`config`]: layered runtime configuration.
//!
//! # Logging
//!
//! The runtime emits `tracing` events and spans:
//!
//! | level | event |
//! |---|---|
//! | `trace` | property, command and interaction creation |
//! | `debug` | command execution span, settlement, rejected admissions |
//! | `warn` | unhandled interactions, failed deferred writes, binding errors |
//!
//! Nothing is logged at `info` or above on the success path.

pub mod command;
pub mod config;
pub mod factory;
pub mod interaction;
pub mod reactive;

pub use command::{Command, ProgressContext};
pub use config::{ConfigError, ReactiveConfig, SchedulerKind};
pub use factory::{CommandBuilder, CreationHook, NoopHook, ReactiveFactory};
pub use interaction::{Interaction, InteractionContext};
pub use reactive::{
    Binding, BindingScope, GateGuard, GateKind, Property, ReactiveProperty, TwoWayBinding,
    UiProperty,
};

pub use rxmvvm_core::{
    ErrorKind, ImmediateScheduler, Notification, Observable, QueueScheduler, ReactiveError,
    Scheduler, Subject, Subscription, ThreadScheduler, Value,
};
