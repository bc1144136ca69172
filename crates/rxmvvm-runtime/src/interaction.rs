#![forbid(unsafe_code)]

//! Request/response handshakes between a view model and its view.
//!
//! [`Interaction::invoke`] publishes an [`InteractionContext`] to the
//! interaction's subscribers and fails when there are none. The first
//! subscriber is expected to answer through [`InteractionContext::handle`] or
//! [`InteractionContext::handle_with`]; the answer reaches the invoker's
//! callback exactly once.
//!
//! # Invariants
//!
//! 1. A context is handled at most once; later attempts fail with
//!    [`ReactiveError::AlreadyHandledInteraction`] and do not call back.
//! 2. The callback is released as soon as it has run.
//!
//! # Failure Modes
//!
//! - Invoking with no subscriber returns
//!   [`ReactiveError::UnhandledInteraction`] and drops the callback unused.
//! - A context nobody handles never calls back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rxmvvm_core::sync::lock;
use rxmvvm_core::{InteractionId, Observable, ReactiveError, Subject, Value};
use tracing::{trace, warn};

type Callback<R> = Box<dyn FnOnce(Option<R>) + Send>;

// ---------------------------------------------------------------------------
// InteractionContext
// ---------------------------------------------------------------------------

struct ContextInner<T, R> {
    interaction: InteractionId,
    input: Option<T>,
    handled: AtomicBool,
    callback: Mutex<Option<Callback<R>>>,
}

/// One pending request, delivered to the interaction's subscribers.
pub struct InteractionContext<T, R> {
    inner: Arc<ContextInner<T, R>>,
}

impl<T, R> Clone for InteractionContext<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug, R> fmt::Debug for InteractionContext<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction", &self.inner.interaction)
            .field("input", &self.inner.input)
            .field("handled", &self.is_handled())
            .finish()
    }
}

impl<T, R> InteractionContext<T, R> {
    /// The request payload.
    #[must_use]
    pub fn input(&self) -> Option<&T> {
        self.inner.input.as_ref()
    }

    /// Whether an answer has been given.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.inner.handled.load(Ordering::Acquire)
    }

    /// Answer without a result.
    pub fn handle(&self) -> Result<(), ReactiveError> {
        self.respond(None)
    }

    /// Answer with `result`.
    pub fn handle_with(&self, result: R) -> Result<(), ReactiveError> {
        self.respond(Some(result))
    }

    fn respond(&self, result: Option<R>) -> Result<(), ReactiveError> {
        if self
            .inner
            .handled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReactiveError::AlreadyHandledInteraction {
                interaction: self.inner.interaction,
            });
        }
        let callback = lock(&self.inner.callback).take();
        if let Some(callback) = callback {
            callback(result);
        }
        trace!(interaction = %self.inner.interaction, "interaction handled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// A stream of requests that expect exactly one answer each.
pub struct Interaction<T, R> {
    id: InteractionId,
    requests: Subject<InteractionContext<T, R>>,
}

impl<T, R> Clone for Interaction<T, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            requests: self.requests.clone(),
        }
    }
}

impl<T, R> fmt::Debug for Interaction<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction").field("id", &self.id).finish()
    }
}

impl<T: Value, R: Send + 'static> Default for Interaction<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value, R: Send + 'static> Interaction<T, R> {
    /// A new interaction with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let id = InteractionId::next();
        trace!(interaction = %id, "interaction created");
        Self {
            id,
            requests: Subject::new(),
        }
    }

    /// Identity of the interaction.
    #[must_use]
    pub fn id(&self) -> InteractionId {
        self.id
    }

    /// Whether anything is subscribed to handle requests.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.requests.has_observers()
    }

    /// Publish a request. `on_result` runs when a subscriber answers.
    pub fn invoke(
        &self,
        input: Option<T>,
        on_result: impl FnOnce(Option<R>) + Send + 'static,
    ) -> Result<(), ReactiveError> {
        if !self.requests.has_observers() {
            warn!(interaction = %self.id, "interaction invoked with no handler");
            return Err(ReactiveError::UnhandledInteraction {
                interaction: self.id,
            });
        }
        let context = InteractionContext {
            inner: Arc::new(ContextInner {
                interaction: self.id,
                input,
                handled: AtomicBool::new(false),
                callback: Mutex::new(Some(Box::new(on_result))),
            }),
        };
        self.requests.next(context);
        Ok(())
    }

    /// Stream of requests.
    #[must_use]
    pub fn as_observable(&self) -> Observable<InteractionContext<T, R>> {
        self.requests.as_observable()
    }
}
