#![forbid(unsafe_code)]

//! Constructors for properties, commands and interactions.
//!
//! [`ReactiveFactory`] normalizes every caller-supplied shape into the
//! uniform command contract and reports each property and command it
//! creates to its [`CreationHook`].
//!
//! | builder method | shape | command |
//! |---|---|---|
//! | `from_action` | `() -> ()` | `Command<(), ()>` |
//! | `from_supplier` | `() -> R` | `Command<(), R>` |
//! | `from_consumer` | `T -> ()` | `Command<T, ()>` |
//! | `from_function` | `T -> R` | `Command<T, R>` |
//! | `from_observable` | `() -> Observable<R>` | `Command<(), R>` |
//! | `from_observable_function` | `T -> Observable<R>` | `Command<T, R>` |
//!
//! Every shape has a `progress_*` counterpart receiving a
//! [`ProgressContext`], and the fallible `try_*` forms return
//! `Result<R, ReactiveError>`. Shapes taking `T` require input.

use std::fmt;
use std::sync::Arc;

use rxmvvm_core::{
    CommandId, ImmediateScheduler, Observable, PropertyId, ReactiveError, Scheduler,
    ThreadScheduler, Value,
};

use crate::command::{Command, CommandSettings, CompositeChildren, Execution, ProgressContext};
use crate::config::{ReactiveConfig, SchedulerKind};
use crate::interaction::Interaction;
use crate::reactive::{Property, ReactiveProperty, UiProperty};

/// Observes every entity a [`ReactiveFactory`] creates.
pub trait CreationHook: Send + Sync {
    /// A command was created.
    fn command_created(&self, _command: CommandId) {}

    /// A property was created.
    fn property_created(&self, _property: PropertyId) {}
}

/// The default hook. Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl CreationHook for NoopHook {}

fn missing_input() -> ReactiveError {
    ReactiveError::NullArgument { name: "input" }
}

// ---------------------------------------------------------------------------
// ReactiveFactory
// ---------------------------------------------------------------------------

/// Entry point for creating reactive primitives.
#[derive(Clone)]
pub struct ReactiveFactory {
    hook: Arc<dyn CreationHook>,
    scheduler: Arc<dyn Scheduler>,
    log_rejections: bool,
}

impl fmt::Debug for ReactiveFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveFactory")
            .field("log_rejections", &self.log_rejections)
            .finish_non_exhaustive()
    }
}

impl Default for ReactiveFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveFactory {
    /// Inline execution, no hook.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hook: Arc::new(NoopHook),
            scheduler: Arc::new(ImmediateScheduler),
            log_rejections: true,
        }
    }

    /// A factory configured from `config`.
    #[must_use]
    pub fn from_config(config: &ReactiveConfig) -> Self {
        let scheduler: Arc<dyn Scheduler> = match config.scheduler {
            SchedulerKind::Immediate => Arc::new(ImmediateScheduler),
            SchedulerKind::Thread => Arc::new(ThreadScheduler::new(config.thread_name.clone())),
        };
        Self {
            hook: Arc::new(NoopHook),
            scheduler,
            log_rejections: config.log_rejections,
        }
    }

    /// Report created entities to `hook`.
    #[must_use]
    pub fn with_hook(mut self, hook: impl CreationHook + 'static) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    /// Default scheduler for commands built by this factory.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    fn created<T: Value>(&self, property: Property<T>) -> Property<T> {
        self.hook.property_created(property.id());
        property
    }

    /// An empty, writable property.
    pub fn property<T: Value>(&self) -> Property<T> {
        self.created(Property::new())
    }

    /// A writable property holding `value`.
    pub fn property_with<T: Value>(&self, value: T) -> Property<T> {
        self.created(Property::with_value(value))
    }

    /// A read-only property following `source`.
    pub fn property_from<T: Value>(&self, source: &Observable<T>) -> Property<T> {
        self.created(Property::from_observable(source))
    }

    /// A read-only mirror of `source`.
    pub fn property_from_property<T: Value>(
        &self,
        source: &impl ReactiveProperty<T>,
    ) -> Property<T> {
        self.created(Property::from_property(source))
    }

    /// A read-only property of `combine` over two properties.
    pub fn combine_properties<A: Value, B: Value, T: Value>(
        &self,
        first: &impl ReactiveProperty<A>,
        second: &impl ReactiveProperty<B>,
        combine: impl Fn(&A, &B) -> T + Send + Sync + 'static,
    ) -> Property<T> {
        self.created(Property::combine(first, second, combine))
    }

    /// Decorate `property` so that writes run through `access`.
    pub fn ui_property<T: Value, P: ReactiveProperty<T> + Clone + 'static>(
        &self,
        access: Arc<dyn Scheduler>,
        property: P,
    ) -> UiProperty<T, P> {
        UiProperty::new(access, property)
    }

    /// A new interaction.
    pub fn interaction<T: Value, R: Send + 'static>(&self) -> Interaction<T, R> {
        Interaction::new()
    }

    /// Start building a command.
    #[must_use]
    pub fn command(&self) -> CommandBuilder {
        CommandBuilder {
            gate: None,
            scheduler: Arc::clone(&self.scheduler),
            hook: Arc::clone(&self.hook),
            log_rejections: self.log_rejections,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandBuilder
// ---------------------------------------------------------------------------

/// Collects the gate and scheduler of a command, then takes its body.
#[must_use = "a builder does nothing until a body is supplied"]
pub struct CommandBuilder {
    gate: Option<Observable<bool>>,
    scheduler: Arc<dyn Scheduler>,
    hook: Arc<dyn CreationHook>,
    log_rejections: bool,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("gated", &self.gate.is_some())
            .finish_non_exhaustive()
    }
}

impl CommandBuilder {
    /// Only admit executions while `gate` last emitted `true`.
    pub fn can_execute(mut self, gate: Observable<bool>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Run synchronous bodies on `scheduler`.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    fn build<T: Value, R: Value>(
        self,
        execution: Execution<T, R>,
        requires_input: bool,
    ) -> Command<T, R> {
        let hook = Arc::clone(&self.hook);
        let command = Command::build(
            execution,
            CommandSettings {
                gate: self.gate,
                scheduler: self.scheduler,
                requires_input,
                log_rejections: self.log_rejections,
            },
        );
        hook.command_created(command.id());
        command
    }

    /// `() -> ()`.
    pub fn from_action(self, action: impl Fn() + Send + Sync + 'static) -> Command<(), ()> {
        self.build(
            Execution::Sync(Box::new(move |_| {
                action();
                Ok(())
            })),
            false,
        )
    }

    /// `() -> R`.
    pub fn from_supplier<R: Value>(
        self,
        supplier: impl Fn() -> R + Send + Sync + 'static,
    ) -> Command<(), R> {
        self.build(Execution::Sync(Box::new(move |_| Ok(supplier()))), false)
    }

    /// `() -> Result<R, ReactiveError>`.
    pub fn try_from_supplier<R: Value>(
        self,
        supplier: impl Fn() -> Result<R, ReactiveError> + Send + Sync + 'static,
    ) -> Command<(), R> {
        self.build(Execution::Sync(Box::new(move |_| supplier())), false)
    }

    /// `T -> ()`.
    pub fn from_consumer<T: Value>(
        self,
        consumer: impl Fn(T) + Send + Sync + 'static,
    ) -> Command<T, ()> {
        self.build(
            Execution::Sync(Box::new(move |input: Option<T>| {
                input.map(&consumer).ok_or_else(missing_input)
            })),
            true,
        )
    }

    /// `T -> R`.
    pub fn from_function<T: Value, R: Value>(
        self,
        function: impl Fn(T) -> R + Send + Sync + 'static,
    ) -> Command<T, R> {
        self.build(
            Execution::Sync(Box::new(move |input: Option<T>| {
                input.map(&function).ok_or_else(missing_input)
            })),
            true,
        )
    }

    /// `T -> Result<R, ReactiveError>`.
    pub fn try_from_function<T: Value, R: Value>(
        self,
        function: impl Fn(T) -> Result<R, ReactiveError> + Send + Sync + 'static,
    ) -> Command<T, R> {
        self.build(
            Execution::Sync(Box::new(move |input: Option<T>| {
                function(input.ok_or_else(missing_input)?)
            })),
            true,
        )
    }

    /// `() -> Observable<R>`. The first value is the result.
    pub fn from_observable<R: Value>(
        self,
        source: impl Fn() -> Observable<R> + Send + Sync + 'static,
    ) -> Command<(), R> {
        self.build(Execution::Async(Box::new(move |_| source())), false)
    }

    /// `T -> Observable<R>`. The first value is the result.
    pub fn from_observable_function<T: Value, R: Value>(
        self,
        source: impl Fn(T) -> Observable<R> + Send + Sync + 'static,
    ) -> Command<T, R> {
        self.build(
            Execution::Async(Box::new(move |input: Option<T>| match input {
                Some(input) => source(input),
                None => Observable::failed(missing_input()),
            })),
            true,
        )
    }

    /// `() -> ()` with progress.
    pub fn progress_from_action(
        self,
        action: impl Fn(&ProgressContext) + Send + Sync + 'static,
    ) -> Command<(), ()> {
        self.build(
            Execution::Progress(Box::new(move |progress, _| {
                action(&progress);
                Ok(())
            })),
            false,
        )
    }

    /// `() -> R` with progress.
    pub fn progress_from_supplier<R: Value>(
        self,
        supplier: impl Fn(&ProgressContext) -> R + Send + Sync + 'static,
    ) -> Command<(), R> {
        self.build(
            Execution::Progress(Box::new(move |progress, _| Ok(supplier(&progress)))),
            false,
        )
    }

    /// `T -> ()` with progress.
    pub fn progress_from_consumer<T: Value>(
        self,
        consumer: impl Fn(&ProgressContext, T) + Send + Sync + 'static,
    ) -> Command<T, ()> {
        self.build(
            Execution::Progress(Box::new(move |progress, input: Option<T>| {
                consumer(&progress, input.ok_or_else(missing_input)?);
                Ok(())
            })),
            true,
        )
    }

    /// `T -> R` with progress.
    pub fn progress_from_function<T: Value, R: Value>(
        self,
        function: impl Fn(&ProgressContext, T) -> R + Send + Sync + 'static,
    ) -> Command<T, R> {
        self.build(
            Execution::Progress(Box::new(move |progress, input: Option<T>| {
                Ok(function(&progress, input.ok_or_else(missing_input)?))
            })),
            true,
        )
    }

    /// `() -> Observable<R>` with progress.
    pub fn progress_from_observable<R: Value>(
        self,
        source: impl Fn(ProgressContext) -> Observable<R> + Send + Sync + 'static,
    ) -> Command<(), R> {
        self.build(
            Execution::AsyncProgress(Box::new(move |progress, _| source(progress))),
            false,
        )
    }

    /// `T -> Observable<R>` with progress.
    pub fn progress_from_observable_function<T: Value, R: Value>(
        self,
        source: impl Fn(ProgressContext, T) -> Observable<R> + Send + Sync + 'static,
    ) -> Command<T, R> {
        self.build(
            Execution::AsyncProgress(Box::new(move |progress, input: Option<T>| match input {
                Some(input) => source(progress, input),
                None => Observable::failed(missing_input()),
            })),
            true,
        )
    }

    /// A command executing every child in parallel and zipping their
    /// results in declaration order.
    ///
    /// Fails with [`ReactiveError::IllegalArgument`] when `children` is
    /// empty; nothing is reported to the creation hook in that case.
    pub fn composite<T: Value, R: Value>(
        mut self,
        children: Vec<Command<T, R>>,
    ) -> Result<Command<T, Vec<R>>, ReactiveError> {
        let children = CompositeChildren::new(children)?;
        let requires_input = children.requires_input();
        let child_gate = children.gate();
        self.gate = Some(match self.gate.take() {
            Some(gate) => Observable::combine_latest(vec![gate, child_gate])
                .map(|open: Vec<bool>| open.iter().all(|g| *g)),
            None => child_gate,
        });
        Ok(self.build(Execution::Composite(Box::new(children)), requires_input))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
