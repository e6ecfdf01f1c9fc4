//! Zarr storage (stores and storage traits).
//!
//! A store is a system that can be used to store and retrieve data from a Zarr hierarchy through
//! string keys. This module defines the abstract store interface as a family of traits
//! ([readable](ReadableStorageTraits), [writable](WritableStorageTraits),
//! [listable](ListableStorageTraits)), concrete [stores](store), and the mapping from hierarchy
//! node paths and chunk indices to store keys.
//!
//! A missing key is not an error at this level: [`ReadableStorageTraits::get`] returns
//! [`MaybeBytes`], and it is up to the array layer to substitute fill values for chunks that have
//! never been written.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#storage>.

pub mod storage_sync;
pub mod store;
mod store_key;
mod store_lock;
mod store_prefix;

use std::sync::Arc;

use thiserror::Error;

pub use storage_sync::{
    discover_children, get_child_nodes, node_exists, ListableStorageTraits,
    ReadableStorageTraits, ReadableWritableListableStorageTraits, ReadableWritableStorageTraits,
    WritableStorageTraits,
};
pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_lock::{StoreKeyMutex, StoreLocks};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

use crate::{byte_range::InvalidByteRangeError, node::NodePath};

/// The bytes of a store value, or [`None`] if the key is absent.
pub type MaybeBytes = Option<Vec<u8>>;

/// A readable, writable, and listable storage handle.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error(transparent)]
    StoreKeyError(#[from] StoreKeyError),
    /// An invalid store prefix.
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    /// An invalid byte range.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// The metadata at a key is malformed.
    #[error("invalid metadata at {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// An unsupported storage operation.
    #[error("unsupported storage operation: {_0}")]
    Unsupported(String),
    /// Other error.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// The keys and prefixes of a [`ListableStorageTraits::list_dir`] operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreKeysPrefixes {
    keys: StoreKeys,
    prefixes: StorePrefixes,
}

impl StoreKeysPrefixes {
    /// Create a new [`StoreKeysPrefixes`].
    #[must_use]
    pub fn new(keys: StoreKeys, prefixes: StorePrefixes) -> Self {
        Self { keys, prefixes }
    }

    /// Returns the keys.
    #[must_use]
    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Returns the prefixes.
    #[must_use]
    pub fn prefixes(&self) -> &StorePrefixes {
        &self.prefixes
    }
}

/// Return the metadata key (`zarr.json`) of the node at `path`.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    let path = path.as_str();
    if path.eq("/") {
        unsafe { StoreKey::new_unchecked("zarr.json".to_string()) }
    } else {
        let path = path.strip_prefix('/').unwrap_or(path);
        unsafe { StoreKey::new_unchecked(format!("{path}/zarr.json")) }
    }
}

/// Return the data key of the chunk with key suffix `chunk_key` of the array at `path`.
#[must_use]
pub fn data_key(path: &NodePath, chunk_key: &str) -> StoreKey {
    let path = path.as_str();
    if path.eq("/") {
        unsafe { StoreKey::new_unchecked(chunk_key.to_string()) }
    } else {
        let path = path.strip_prefix('/').unwrap_or(path);
        unsafe { StoreKey::new_unchecked(format!("{path}/{chunk_key}")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        assert_eq!(
            meta_key(&NodePath::root()),
            StoreKey::new("zarr.json").unwrap()
        );
        assert_eq!(
            meta_key(&NodePath::new("/a/b").unwrap()),
            StoreKey::new("a/b/zarr.json").unwrap()
        );
        assert_eq!(
            data_key(&NodePath::new("/a/b").unwrap(), "c/1/0"),
            StoreKey::new("a/b/c/1/0").unwrap()
        );
        assert_eq!(
            data_key(&NodePath::root(), "c/0"),
            StoreKey::new("c/0").unwrap()
        );
    }
}
