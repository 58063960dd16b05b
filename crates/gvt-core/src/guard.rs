//! Re-entrancy guard
//!
//! Entry points that move value hold the guard for the duration of the
//! call. A collaborator that calls back into the same engine on the same
//! thread while the guard is held gets [`GvtError::ReentrantCall`] instead of
//! observing half-applied state. Callers on other threads wait for the
//! holder to finish.

use crate::error::{GvtError, Result};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: ReentrantMutex<Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard. Released when the returned token is dropped.
    pub fn enter(&self) -> Result<Entered<'_>> {
        let lock = self.entered.lock();
        if lock.get() {
            return Err(GvtError::ReentrantCall);
        }
        lock.set(true);
        Ok(Entered { lock })
    }
}

/// Proof that the guard is held
pub struct Entered<'a> {
    lock: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.lock.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let outer = guard.enter().unwrap();
        assert!(matches!(guard.enter(), Err(GvtError::ReentrantCall)));
        drop(outer);
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_other_threads_wait() {
        let guard = Arc::new(ReentrancyGuard::new());
        let held = guard.enter().unwrap();

        let other = Arc::clone(&guard);
        let handle = std::thread::spawn(move || other.enter().map(|_| ()));
        drop(held);
        assert!(handle.join().unwrap().is_ok());
    }
}
