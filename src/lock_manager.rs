//! Named reentrant locks shared between subsystems.
//!
//! Subsystems that guard the same logical resource ask for the lock by a
//! well-known name instead of creating competing locks of their own.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, ReentrantMutex};

/// Reentrant lock handed out by the [`LockManager`].
pub type SharedLock = Arc<ReentrantMutex<()>>;

static GLOBAL_LOCKS: LazyLock<LockManager> = LazyLock::new(LockManager::new);

/// Hands out one [`SharedLock`] per name.
#[derive(Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, SharedLock>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide manager.
    pub fn global() -> &'static LockManager {
        &GLOBAL_LOCKS
    }

    /// Returns the lock registered under `name`, creating it on first use.
    pub fn lock(&self, name: &str) -> SharedLock {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(name) {
            return lock.clone();
        }

        tracing::trace!(lock = name, "creating shared lock");
        let lock = Arc::new(ReentrantMutex::new(()));
        locks.insert(name.to_owned(), lock.clone());
        lock
    }

    /// Names of every lock handed out so far.
    pub fn names(&self) -> Vec<String> {
        self.locks.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_same_lock() {
        let manager = LockManager::new();
        let a = manager.lock("registry.command");
        let b = manager.lock("registry.command");
        let c = manager.lock("registry.other");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(manager.names().len(), 2);
    }

    #[test]
    fn test_lock_is_reentrant() {
        let lock = LockManager::new().lock("reentrant");
        let _outer = lock.lock();
        let inner = lock.try_lock();
        assert!(inner.is_some());
    }

    #[test]
    fn test_global_is_shared() {
        let a = LockManager::global().lock("lock_manager.tests.global");
        let b = LockManager::global().lock("lock_manager.tests.global");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
