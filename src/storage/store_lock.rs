//! Store key locking.
//!
//! Read-modify-write of a partially overwritten chunk must be atomic with respect to other
//! writers of the same chunk. Stores hand out a mutex per store key for this purpose.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use super::StoreKey;

/// A mutex guarding a single store key.
pub type StoreKeyMutex = Arc<Mutex<()>>;

/// A registry of per-key mutexes.
///
/// Mutexes are created on first use and shared between callers requesting the same key.
#[derive(Debug, Default)]
pub struct StoreLocks {
    locks: Mutex<HashMap<StoreKey, StoreKeyMutex>>,
}

impl StoreLocks {
    /// Create a new empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the mutex for `key`, creating it if it does not exist.
    #[must_use]
    pub fn mutex(&self, key: &StoreKey) -> StoreKeyMutex {
        let mut locks = self.locks.lock();
        locks.entry(key.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_mutex() {
        let locks = StoreLocks::new();
        let key0 = StoreKey::new("a/b").unwrap();
        let key1 = StoreKey::new("a/c").unwrap();
        assert!(Arc::ptr_eq(&locks.mutex(&key0), &locks.mutex(&key0)));
        assert!(!Arc::ptr_eq(&locks.mutex(&key0), &locks.mutex(&key1)));
    }
}
