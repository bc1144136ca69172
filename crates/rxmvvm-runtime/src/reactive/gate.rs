#![forbid(unsafe_code)]

//! Scoped tokens for property suppression and delay.

use std::fmt;

type Release = Box<dyn FnOnce() + Send>;

/// Holds one level of a property's suppress or delay gate.
///
/// Dropping the guard, or calling [`release`](Self::release), gives the level
/// back. Releasing twice is a no-op.
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    kind: GateKind,
    release: Option<Release>,
}

/// Which gate a [`GateGuard`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Writes are stored but never published.
    Suppress,
    /// Writes are stored and the last one is published on release.
    Delay,
}

impl GateGuard {
    pub(crate) fn new(kind: GateKind, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            release: Some(Box::new(release)),
        }
    }

    /// The gate this guard holds.
    #[must_use]
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Give the level back now.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the level has already been given back.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for GateGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateGuard")
            .field("kind", &self.kind)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn release_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut guard = GateGuard::new(GateKind::Delay, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(guard.kind(), GateKind::Delay);
        guard.release();
        guard.release();
        drop(guard);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
