#![forbid(unsafe_code)]

//! RAII subscription tokens.
//!
//! # Invariants
//!
//! 1. The release action runs at most once, on [`Subscription::unsubscribe`]
//!    or on drop, whichever comes first.
//! 2. [`Subscription::all`] releases its parts in reverse registration order.

use std::fmt;

type Release = Box<dyn FnOnce() + Send>;

/// A handle to an active subscription.
///
/// Dropping the handle releases the subscription. Use
/// [`detach`](Self::detach) to keep it alive for the lifetime of the source.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Release>,
}

impl Subscription {
    /// Create a subscription that runs `release` when disposed.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Combine several subscriptions into one.
    pub fn all(parts: Vec<Subscription>) -> Self {
        Self::new(move || {
            let mut parts = parts;
            while let Some(part) = parts.pop() {
                drop(part);
            }
        })
    }

    /// Release now. Subsequent calls (and the eventual drop) do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether this handle has already been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Give up the handle without releasing.
    ///
    /// The release action is leaked, so the subscription lives as long as
    /// its source.
    pub fn detach(mut self) {
        if let Some(release) = self.release.take() {
            std::mem::forget(release);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drop_releases_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.is_released());
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_skips_release() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .detach();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_releases_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let parts = (0..3)
            .map(|i| {
                let o = Arc::clone(&order);
                Subscription::new(move || o.lock().unwrap().push(i))
            })
            .collect();
        drop(Subscription::all(parts));
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn debug_format() {
        let sub = Subscription::empty();
        assert!(format!("{sub:?}").contains("released: true"));
    }
}
