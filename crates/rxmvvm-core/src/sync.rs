#![forbid(unsafe_code)]

//! Lock helpers.
//!
//! A subscriber that panics while a lock is held poisons it. The state every
//! rxmvvm lock protects stays consistent across such a panic (each critical
//! section either completes its writes or performs none), so the guard is
//! recovered instead of propagating the poison.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, recovering the guard if the lock is poisoned.
#[inline]
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
