#![forbid(unsafe_code)]

//! Stream primitives for the rxmvvm reactive core.
//!
//! This crate holds the pieces every view-model primitive is built from:
//!
//! - [`Observable`]: a cold-on-subscribe stream. Each subscription runs the
//!   stream's subscribe function once.
//! - [`Subject`]: a hot multicast source, optionally replaying its latest
//!   value to new subscribers.
//! - [`Subscription`]: RAII token that releases a subscription on drop.
//! - [`Scheduler`]: "accept a unit of work and eventually run it".
//! - [`ReactiveError`]: the error taxonomy shared by properties, commands and
//!   interactions.
//!
//! # Architecture
//!
//! All primitives are `Send + Sync` and backed by `Arc`. Subjects never call
//! into subscribers while holding their own lock: notifications are queued
//! and drained by exactly one thread at a time, which gives every subject a
//! single total delivery order and makes re-entrant emission safe.
//!
//! # Invariants
//!
//! 1. A [`Sink`] delivers nothing after `error`, `complete`, or disposal.
//! 2. All subscribers of a [`Subject`] observe notifications in the same order.
//! 3. A terminated subject replays only its terminal notification.
//! 4. Releasing a [`Subscription`] twice is a no-op.

pub mod error;
pub mod id;
pub mod observable;
mod operators;
pub mod scheduler;
pub mod subject;
pub mod subscription;
pub mod sync;

pub use error::{ErrorKind, ReactiveError};
pub use id::{CommandId, InteractionId, PropertyId};
pub use observable::{Notification, Observable, Sink, Value};
pub use scheduler::{ImmediateScheduler, QueueScheduler, Scheduler, ThreadScheduler, Work};
pub use subject::Subject;
pub use subscription::Subscription;
