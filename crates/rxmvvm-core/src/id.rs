#![forbid(unsafe_code)]

//! Process-unique identifiers for reactive entities.
//!
//! Errors refer to the entity that raised them by id rather than by
//! reference, so they stay `Send + Sync + Clone` without keeping the entity
//! alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $label:literal) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Allocate the next unique id.
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw id value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a reactive property.
    PropertyId,
    PROPERTY_ID_COUNTER,
    "property"
);

entity_id!(
    /// Identifies a reactive command.
    CommandId,
    COMMAND_ID_COUNTER,
    "command"
);

entity_id!(
    /// Identifies an interaction.
    InteractionId,
    INTERACTION_ID_COUNTER,
    "interaction"
);
