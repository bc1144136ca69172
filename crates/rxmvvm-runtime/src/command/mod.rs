#![forbid(unsafe_code)]

//! Reactive commands.
//!
//! A [`Command<T, R>`] is a gated operation taking an optional `T` and
//! producing an `R`. Its state is exposed as streams:
//!
//! | stream | replays | initial |
//! |---|---|---|
//! | [`can_execute`](Command::can_execute) | yes | `true` |
//! | [`is_executing`](Command::is_executing) | yes | `false` |
//! | [`execution_count`](Command::execution_count) | yes | `0` |
//! | [`progress`](Command::progress) | yes | `0.0` |
//! | [`result`](Command::result) | no | |
//! | [`error`](Command::error) | no | |
//!
//! # Admission
//!
//! Subscribing to [`execute`](Command::execute) makes one admission attempt.
//! A closed gate or an execution already in flight publishes
//! [`ReactiveError::CannotExecuteCommand`] on the error stream and completes
//! the returned stream empty; nothing else changes. An admitted execution
//! flips `is_executing` to `true`, resets progress and runs on the command's
//! scheduler. Settlement publishes exactly one result or error, forces
//! progress to `1.0`, flips `is_executing` back and increments the count.
//!
//! # Invariants
//!
//! 1. `can_execute` equals `gate ∧ ¬is_executing`, and is `false` for good
//!    once the gate stream fails.
//! 2. Each admitted execution settles exactly once.
//! 3. Status changes are queued under the command lock, so every stream sees
//!    them in state order; delivery happens after the lock is released.
//!
//! # Failure Modes
//!
//! - Errors raised by an execution surface on [`error`](Command::error) and
//!   never as a stream error of `execute`.
//! - A panic in user code settles the execution with an
//!   [`ErrorKind::Upstream`](rxmvvm_core::ErrorKind::Upstream) error carrying
//!   the panic message; the command stays usable.
//! - Dropping the `execute` subscription does not cancel the execution; its
//!   status updates still apply.

mod composite;
mod execution;
mod progress;

pub(crate) use composite::CompositeChildren;
pub(crate) use execution::Execution;
pub use progress::ProgressContext;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rxmvvm_core::sync::lock;
use rxmvvm_core::{
    CommandId, Notification, Observable, ReactiveError, Scheduler, Sink, Subject, Subscription,
    Value,
};
use tracing::{debug, trace, warn};

use execution::Settlement;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct CommandState {
    gate_open: bool,
    gate_failed: bool,
    executing: bool,
    count: u64,
    published_can_execute: bool,
}

impl CommandState {
    fn can_execute(&self) -> bool {
        self.gate_open && !self.gate_failed && !self.executing
    }
}

struct Streams<R> {
    can_execute: Subject<bool>,
    is_executing: Subject<bool>,
    execution_count: Subject<u64>,
    progress: Subject<f32>,
    result: Subject<R>,
    error: Subject<ReactiveError>,
}

impl<R: Value> Streams<R> {
    fn new() -> Self {
        Self {
            can_execute: Subject::replaying(true),
            is_executing: Subject::replaying(false),
            execution_count: Subject::replaying(0),
            progress: Subject::replaying(0.0),
            result: Subject::new(),
            error: Subject::new(),
        }
    }

    fn drain(&self) {
        self.result.drain();
        self.error.drain();
        self.progress.drain();
        self.is_executing.drain();
        self.can_execute.drain();
        self.execution_count.drain();
    }
}

pub(crate) struct CommandSettings {
    pub(crate) gate: Option<Observable<bool>>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) requires_input: bool,
    pub(crate) log_rejections: bool,
}

struct CommandInner<T, R> {
    id: CommandId,
    execution: Execution<T, R>,
    scheduler: Arc<dyn Scheduler>,
    requires_input: bool,
    log_rejections: bool,
    state: Mutex<CommandState>,
    streams: Streams<R>,
    gate: Mutex<Option<Subscription>>,
}

impl<T: Value, R: Value> CommandInner<T, R> {
    /// Queue a `can_execute` change if the effective value moved.
    fn refresh_can_execute(&self, state: &mut CommandState) {
        let now = state.can_execute();
        if now != state.published_can_execute {
            state.published_can_execute = now;
            self.streams.can_execute.enqueue(Notification::Next(now));
        }
    }

    fn on_gate(&self, notification: Notification<bool>) {
        {
            let mut state = lock(&self.state);
            match notification {
                Notification::Next(open) => {
                    state.gate_open = open;
                    self.refresh_can_execute(&mut state);
                }
                Notification::Error(error) => {
                    state.gate_failed = true;
                    state.published_can_execute = false;
                    self.streams.can_execute.enqueue(Notification::Error(error));
                }
                Notification::Complete => {}
            }
            trace!(command = %self.id, can_execute = state.can_execute(), "command gate changed");
        }
        self.streams.can_execute.drain();
    }

    fn admit(self: &Arc<Self>, input: Option<T>, sink: Sink<R>) -> Subscription {
        let progress = {
            let mut state = lock(&self.state);
            if state.can_execute() {
                state.executing = true;
                self.streams.is_executing.enqueue(Notification::Next(true));
                self.refresh_can_execute(&mut state);
                Some(ProgressContext::start(&self.streams.progress))
            } else {
                None
            }
        };
        self.streams.drain();

        let Some(progress) = progress else {
            if self.log_rejections {
                debug!(command = %self.id, "command execution rejected");
            }
            self.streams.error.next(ReactiveError::CannotExecuteCommand { command: self.id });
            sink.complete();
            return Subscription::empty();
        };
        debug!(command = %self.id, kind = self.execution.label(), "command execution admitted");

        let run = Arc::new(Run {
            command: Arc::clone(self),
            sink,
            progress,
            settled: AtomicBool::new(false),
            upstream: Mutex::new(None),
        });

        if input.is_none() && self.requires_input {
            run.settle(Err(ReactiveError::NullArgument { name: "input" }));
            return Subscription::empty();
        }

        let command = Arc::clone(self);
        self.scheduler
            .schedule(Box::new(move || command.dispatch(&run, input)));
        Subscription::empty()
    }

    fn dispatch(&self, run: &Arc<Run<T, R>>, input: Option<T>) {
        let _span = tracing::debug_span!(
            "command_execute",
            command = %self.id,
            kind = self.execution.label()
        )
        .entered();

        let launched = panic::catch_unwind(AssertUnwindSafe(|| match &self.execution {
            Execution::Sync(execute) => run.settle(execute(input)),
            Execution::Progress(execute) => run.settle(execute(run.progress.clone(), input)),
            Execution::Async(execute) => run.follow(&execute(input)),
            Execution::AsyncProgress(execute) => {
                run.follow(&execute(run.progress.clone(), input));
            }
            Execution::Composite(children) => {
                let settling = Arc::clone(run);
                let settlement = Settlement::new(move |outcome| settling.settle(outcome));
                children.launch(input, run.progress.clone(), settlement);
            }
        }));
        if let Err(payload) = launched {
            let error = panic_error(payload.as_ref());
            warn!(command = %self.id, %error, "command execution panicked");
            run.settle(Err(error));
        }
    }
}

/// Turn a panic payload from user code into an upstream error.
fn panic_error(payload: &(dyn Any + Send)) -> ReactiveError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string payload"));
    ReactiveError::message(format!("command execution panicked: {detail}"))
}

// ---------------------------------------------------------------------------
// Run: one admitted execution
// ---------------------------------------------------------------------------

struct Run<T, R> {
    command: Arc<CommandInner<T, R>>,
    sink: Sink<R>,
    progress: ProgressContext,
    settled: AtomicBool,
    upstream: Mutex<Option<Subscription>>,
}

impl<T: Value, R: Value> Run<T, R> {
    /// Settle on the first value of `source`.
    fn follow(self: &Arc<Self>, source: &Observable<R>) {
        let run = Arc::clone(self);
        let subscription = source.observe(move |notification| match notification {
            Notification::Next(value) => run.settle(Ok(value)),
            Notification::Error(error) => run.settle(Err(error)),
            Notification::Complete => run.settle(Err(ReactiveError::NoResult)),
        });
        {
            let mut upstream = lock(&self.upstream);
            if !self.settled.load(Ordering::Acquire) {
                *upstream = Some(subscription);
                return;
            }
        }
        drop(subscription);
    }

    fn settle(&self, outcome: Result<R, ReactiveError>) {
        if self.settled.swap(true, Ordering::AcqRel) {
            return;
        }
        let command = &self.command;
        let count = {
            let mut state = lock(&command.state);
            match &outcome {
                Ok(value) => command
                    .streams
                    .result
                    .enqueue(Notification::Next(value.clone())),
                Err(error) => command
                    .streams
                    .error
                    .enqueue(Notification::Next(error.clone())),
            }
            self.progress.finish();
            state.executing = false;
            command
                .streams
                .is_executing
                .enqueue(Notification::Next(false));
            state.count += 1;
            command
                .streams
                .execution_count
                .enqueue(Notification::Next(state.count));
            command.refresh_can_execute(&mut state);
            state.count
        };
        debug!(
            command = %command.id,
            count,
            ok = outcome.is_ok(),
            "command execution settled"
        );
        command.streams.drain();

        if let Ok(value) = outcome {
            self.sink.next(value);
        }
        self.sink.complete();
        let upstream = lock(&self.upstream).take();
        drop(upstream);
    }
}

// ---------------------------------------------------------------------------
// Command<T, R>
// ---------------------------------------------------------------------------

/// A gated, observable operation.
pub struct Command<T, R> {
    inner: Arc<CommandInner<T, R>>,
}

impl<T, R> Clone for Command<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> fmt::Debug for Command<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Command")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.execution.label())
            .field("can_execute", &state.can_execute())
            .field("executing", &state.executing)
            .field("count", &state.count)
            .finish()
    }
}

impl<T: Value, R: Value> Command<T, R> {
    pub(crate) fn build(execution: Execution<T, R>, settings: CommandSettings) -> Self {
        let inner = Arc::new(CommandInner {
            id: CommandId::next(),
            execution,
            scheduler: settings.scheduler,
            requires_input: settings.requires_input,
            log_rejections: settings.log_rejections,
            state: Mutex::new(CommandState {
                gate_open: true,
                gate_failed: false,
                executing: false,
                count: 0,
                published_can_execute: true,
            }),
            streams: Streams::new(),
            gate: Mutex::new(None),
        });
        trace!(
            command = %inner.id,
            kind = inner.execution.label(),
            requires_input = inner.requires_input,
            "command created"
        );

        if let Some(gate) = settings.gate {
            let weak: Weak<CommandInner<T, R>> = Arc::downgrade(&inner);
            let subscription = gate.observe(move |notification| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_gate(notification);
                }
            });
            *lock(&inner.gate) = Some(subscription);
        }
        Self { inner }
    }

    /// Identity of the command, used in errors and creation hooks.
    #[must_use]
    pub fn id(&self) -> CommandId {
        self.inner.id
    }

    /// Whether `execute()` without input fails with
    /// [`ReactiveError::NullArgument`].
    #[must_use]
    pub fn requires_input(&self) -> bool {
        self.inner.requires_input
    }

    /// Whether an execution would be admitted right now.
    #[must_use]
    pub fn can_execute_now(&self) -> bool {
        lock(&self.inner.state).can_execute()
    }

    /// Whether an execution is in flight.
    #[must_use]
    pub fn is_executing_now(&self) -> bool {
        lock(&self.inner.state).executing
    }

    /// Number of settled executions.
    #[must_use]
    pub fn execution_count_now(&self) -> u64 {
        lock(&self.inner.state).count
    }

    /// Whether executions are admitted; replays the current value.
    #[must_use]
    pub fn can_execute(&self) -> Observable<bool> {
        self.inner.streams.can_execute.as_observable()
    }

    /// Whether an execution is in flight; replays the current value.
    #[must_use]
    pub fn is_executing(&self) -> Observable<bool> {
        self.inner.streams.is_executing.as_observable()
    }

    /// One value per successful execution.
    #[must_use]
    pub fn result(&self) -> Observable<R> {
        self.inner.streams.result.as_observable()
    }

    /// One value per failed or rejected execution.
    #[must_use]
    pub fn error(&self) -> Observable<ReactiveError> {
        self.inner.streams.error.as_observable()
    }

    /// Number of settled executions; replays the current value.
    #[must_use]
    pub fn execution_count(&self) -> Observable<u64> {
        self.inner.streams.execution_count.as_observable()
    }

    /// Whether at least one execution has settled.
    #[must_use]
    pub fn has_been_executed(&self) -> Observable<bool> {
        self.execution_count()
            .map(|count| count > 0)
            .distinct_until_changed()
    }

    /// Progress of the current or last execution; replays the current value.
    #[must_use]
    pub fn progress(&self) -> Observable<f32> {
        self.inner.streams.progress.as_observable()
    }

    /// Execute without input.
    ///
    /// Each subscription makes one admission attempt. The stream emits the
    /// result and completes, or completes empty when the execution is
    /// rejected or fails.
    #[must_use]
    pub fn execute(&self) -> Observable<R> {
        let inner = Arc::clone(&self.inner);
        Observable::create(move |sink| inner.admit(None, sink))
    }

    /// Execute with `input`. See [`execute`](Self::execute).
    #[must_use]
    pub fn execute_with(&self, input: T) -> Observable<R> {
        let inner = Arc::clone(&self.inner);
        Observable::create(move |sink| inner.admit(Some(input.clone()), sink))
    }

    /// Whether two handles share the same command.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
