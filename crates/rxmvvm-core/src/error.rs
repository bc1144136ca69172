#![forbid(unsafe_code)]

//! Error taxonomy shared by every reactive primitive.
//!
//! Errors travel on streams (`Notification::Error`, a command's error stream)
//! as well as through `Result` returns, so [`ReactiveError`] is cheap to clone
//! and carries ids instead of references to the entity that raised it.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::id::{CommandId, InteractionId, PropertyId};

/// Errors raised by properties, commands, interactions and user executions.
#[derive(Debug, Clone)]
pub enum ReactiveError {
    /// A write was attempted on a read-only property.
    ReadOnlyProperty {
        /// The property that rejected the write.
        property: PropertyId,
    },
    /// An execution was attempted while the command's gate was closed.
    CannotExecuteCommand {
        /// The command that rejected the execution.
        command: CommandId,
    },
    /// An interaction was invoked with no subscriber attached.
    UnhandledInteraction {
        /// The interaction that had no handler.
        interaction: InteractionId,
    },
    /// An interaction context was handled a second time.
    AlreadyHandledInteraction {
        /// The interaction the context belongs to.
        interaction: InteractionId,
    },
    /// An argument was outside the accepted domain.
    IllegalArgument {
        /// Human readable description.
        message: Cow<'static, str>,
    },
    /// A mandatory argument was absent.
    NullArgument {
        /// Name of the missing argument.
        name: &'static str,
    },
    /// An asynchronous execution completed without producing a value.
    NoResult,
    /// An error produced by user code or an upstream stream.
    Upstream(Arc<dyn std::error::Error + Send + Sync>),
}

/// Discriminant of [`ReactiveError`], convenient for matching and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ReadOnlyProperty,
    CannotExecuteCommand,
    UnhandledInteraction,
    AlreadyHandledInteraction,
    IllegalArgument,
    NullArgument,
    NoResult,
    Upstream,
}

impl ReactiveError {
    /// Wrap an arbitrary error raised by user code.
    pub fn upstream(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Upstream(Arc::new(error))
    }

    /// Build an upstream error from a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Upstream(Arc::new(MessageError(message.into())))
    }

    /// Build an [`ReactiveError::IllegalArgument`].
    pub fn illegal_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    /// The discriminant of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReadOnlyProperty { .. } => ErrorKind::ReadOnlyProperty,
            Self::CannotExecuteCommand { .. } => ErrorKind::CannotExecuteCommand,
            Self::UnhandledInteraction { .. } => ErrorKind::UnhandledInteraction,
            Self::AlreadyHandledInteraction { .. } => ErrorKind::AlreadyHandledInteraction,
            Self::IllegalArgument { .. } => ErrorKind::IllegalArgument,
            Self::NullArgument { .. } => ErrorKind::NullArgument,
            Self::NoResult => ErrorKind::NoResult,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// Whether two errors are the same occurrence or describe the same fault.
    ///
    /// Upstream errors compare by identity of the wrapped error.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Upstream(a), Self::Upstream(b)) => Arc::ptr_eq(a, b),
            (Self::ReadOnlyProperty { property: a }, Self::ReadOnlyProperty { property: b }) => {
                a == b
            }
            (
                Self::CannotExecuteCommand { command: a },
                Self::CannotExecuteCommand { command: b },
            ) => a == b,
            (
                Self::UnhandledInteraction { interaction: a },
                Self::UnhandledInteraction { interaction: b },
            )
            | (
                Self::AlreadyHandledInteraction { interaction: a },
                Self::AlreadyHandledInteraction { interaction: b },
            ) => a == b,
            (Self::IllegalArgument { message: a }, Self::IllegalArgument { message: b }) => a == b,
            (Self::NullArgument { name: a }, Self::NullArgument { name: b }) => a == b,
            (Self::NoResult, Self::NoResult) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ReactiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnlyProperty { property } => {
                write!(f, "cannot set value of read-only {property}")
            }
            Self::CannotExecuteCommand { command } => {
                write!(f, "{command} cannot be executed right now")
            }
            Self::UnhandledInteraction { interaction } => {
                write!(f, "{interaction} was invoked but nothing handles it")
            }
            Self::AlreadyHandledInteraction { interaction } => {
                write!(f, "{interaction} context has already been handled")
            }
            Self::IllegalArgument { message } => write!(f, "illegal argument: {message}"),
            Self::NullArgument { name } => write!(f, "{name} cannot be absent"),
            Self::NoResult => write!(f, "execution completed without a result"),
            Self::Upstream(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for ReactiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Upstream(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn kind_matches_variant() {
        let command = CommandId::next();
        assert_eq!(
            ReactiveError::CannotExecuteCommand { command }.kind(),
            ErrorKind::CannotExecuteCommand
        );
        assert_eq!(ReactiveError::message("boom").kind(), ErrorKind::Upstream);
        assert_eq!(
            ReactiveError::illegal_argument("empty").kind(),
            ErrorKind::IllegalArgument
        );
    }

    #[test]
    fn display_messages() {
        let err = ReactiveError::NullArgument { name: "input" };
        assert_eq!(err.to_string(), "input cannot be absent");

        let err = ReactiveError::message("disk on fire");
        assert_eq!(err.to_string(), "disk on fire");
        assert!(err.source().is_some());
    }

    #[test]
    fn upstream_compares_by_identity() {
        let a = ReactiveError::message("x");
        let b = ReactiveError::message("x");
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn ids_compare_by_value() {
        let command = CommandId::next();
        let a = ReactiveError::CannotExecuteCommand { command };
        let b = ReactiveError::CannotExecuteCommand { command };
        assert!(a.same_as(&b));
        let other = ReactiveError::CannotExecuteCommand {
            command: CommandId::next(),
        };
        assert!(!a.same_as(&other));
    }
}
