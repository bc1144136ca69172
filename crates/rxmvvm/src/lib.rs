#![forbid(unsafe_code)]

//! rxmvvm public facade.
//!
//! Re-exports the stream primitives of `rxmvvm-core` and, with the default
//! `runtime` feature, the view-model runtime of `rxmvvm-runtime`.
//!
//! ```ignore
//! use rxmvvm::prelude::*;
//!
//! let factory = ReactiveFactory::new();
//! let name = factory.property_with(String::from("Ada"));
//! let save = factory
//!     .command()
//!     .can_execute(name.as_observable().map(|n| !n.is_empty()))
//!     .from_action(|| {});
//! let _run = save.execute().subscribe(|_| {});
//! ```
//!
//! # Features
//!
//! | feature | effect |
//! |---|---|
//! | `runtime` (default) | properties, commands, interactions, bindings |
//! | `config` | `ReactiveConfig::from_toml_str` |

pub use rxmvvm_core as core;
#[cfg(feature = "runtime")]
pub use rxmvvm_runtime as runtime;

pub use rxmvvm_core::{
    CommandId, ErrorKind, ImmediateScheduler, InteractionId, Notification, Observable, PropertyId,
    QueueScheduler, ReactiveError, Scheduler, Sink, Subject, Subscription, ThreadScheduler, Value,
    Work,
};

#[cfg(feature = "runtime")]
pub use rxmvvm_runtime::{
    Binding, BindingScope, Command, CommandBuilder, ConfigError, CreationHook, GateGuard,
    GateKind, Interaction, InteractionContext, NoopHook, ProgressContext, Property,
    ReactiveConfig, ReactiveFactory, ReactiveProperty, SchedulerKind, TwoWayBinding, UiProperty,
    bind, bind_map, bind_map2,
};

/// Everything a view model usually needs.
pub mod prelude {
    pub use rxmvvm_core::{
        ErrorKind, Notification, Observable, ReactiveError, Scheduler, Subject, Subscription,
    };

    #[cfg(feature = "runtime")]
    pub use rxmvvm_runtime::{
        BindingScope, Command, GateGuard, Interaction, InteractionContext, ProgressContext,
        Property, ReactiveFactory, ReactiveProperty, TwoWayBinding, bind, bind_map, bind_map2,
    };
}
