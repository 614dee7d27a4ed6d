use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store-wide exclusive lock.
///
/// Every store operation, reads included, runs while holding the guard, so
/// at most one operation executes at a time on a store instance. The lock
/// protects on-disk state, not in-memory data, so a poisoned lock is simply
/// taken over.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    lock: Mutex<()>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the store is free. The lock is released when the returned
    /// guard is dropped.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
