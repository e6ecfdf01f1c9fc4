//! An in-memory store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::storage::{
    ListableStorageTraits, MaybeBytes, ReadableStorageTraits, ReadableWritableStorageTraits,
    StorageError, StoreKey, StoreKeyMutex, StoreKeys, StoreKeysPrefixes, StoreLocks, StorePrefix,
    WritableStorageTraits,
};

/// An in-memory store.
///
/// Values are held behind per-key read-write locks so concurrent readers of different chunks do
/// not serialise on the store map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Arc<RwLock<Vec<u8>>>>>,
    locks: StoreLocks,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.lock();
        if let Some(data) = data_map.get(key) {
            let data = data.clone();
            drop(data_map);
            let data = data.read();
            Ok(Some(data.clone()))
        } else {
            Ok(None)
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.lock();
        Ok(data_map.get(key).map(|data| data.read().len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock();
        let data = data_map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(data_map);
        *data.write() = value.to_vec();
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock();
        data_map.remove(key);
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock();
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.lock();
        Ok(data_map.keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.lock();
        Ok(data_map
            .keys()
            .filter(|&key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: BTreeSet<StorePrefix> = BTreeSet::default();
        let data_map = self.data_map.lock();
        for key in data_map.keys() {
            if key.has_prefix(prefix) {
                let key_strip = key.as_str().strip_prefix(prefix.as_str()).unwrap_or("");
                let components: Vec<_> = key_strip.split('/').collect();
                if components.len() > 1 {
                    prefixes.insert(StorePrefix::new(
                        &(prefix.as_str().to_string() + components[0] + "/"),
                    )?);
                } else if key.parent().eq(prefix) {
                    keys.push(key.clone());
                }
            }
        }
        let prefixes: Vec<StorePrefix> = prefixes.into_iter().collect();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }
}

impl ReadableWritableStorageTraits for MemoryStore {
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError> {
        Ok(self.locks.mutex(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_range::ByteRange;
    use std::error::Error;

    #[test]
    fn memory_set() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key = "a/b".try_into()?;
        store.set(&key, &[0, 1, 2])?;
        assert_eq!(store.get(&key)?.unwrap(), &[0, 1, 2]);
        store.set(&key, &[3, 4])?;
        assert_eq!(store.get(&key)?.unwrap(), &[3, 4]);
        assert_eq!(store.size_key(&key)?, Some(2));

        assert_eq!(
            store
                .get_partial_values_key(&key, &[ByteRange::FromStart(1, None)])?
                .unwrap()
                .first()
                .unwrap(),
            &[4]
        );
        assert!(store
            .get_partial_values_key(&"a/b/c".try_into()?, &[ByteRange::FromStart(1, None)])?
            .is_none());

        assert!(store.get(&"a/c".try_into()?)?.is_none());
        store.erase(&key)?;
        assert!(store.get(&key)?.is_none());
        // erasing a missing key succeeds
        store.erase(&key)?;
        Ok(())
    }

    #[test]
    fn memory_list() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();

        store.set(&"a/b".try_into()?, &[0])?;
        store.set(&"a/c".try_into()?, &[0, 0])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"a/d/f".try_into()?, &[])?;
        store.erase(&"a/d/e".try_into()?)?;
        assert_eq!(
            store.list()?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/f".try_into()?]
        );
        assert_eq!(
            store.list_prefix(&"a/".try_into()?)?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/f".try_into()?]
        );
        assert_eq!(
            store.list_prefix(&"a/d/".try_into()?)?,
            &["a/d/f".try_into()?]
        );
        assert_eq!(store.list_prefix(&"b/".try_into()?)?, &[]);
        Ok(())
    }

    #[test]
    fn memory_list_dir() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"a/c".try_into()?, &[])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"a/f/g".try_into()?, &[])?;
        store.set(&"a/f/h".try_into()?, &[])?;
        store.set(&"b/c/d".try_into()?, &[])?;

        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.prefixes(), &["a/".try_into()?, "b/".try_into()?]);

        let list_dir = store.list_dir(&"a/".try_into()?)?;
        assert_eq!(list_dir.keys(), &["a/b".try_into()?, "a/c".try_into()?]);
        assert_eq!(
            list_dir.prefixes(),
            &["a/d/".try_into()?, "a/f/".try_into()?]
        );

        store.erase_prefix(&"b/".try_into()?)?;
        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.prefixes(), &["a/".try_into()?]);
        Ok(())
    }
}
