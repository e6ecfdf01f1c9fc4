//! Synchronous storage traits and hierarchy helpers.

use std::sync::Arc;

use crate::{
    byte_range::{extract_byte_ranges, ByteRange},
    node::{Node, NodeMetadata, NodePath},
    storage::meta_key,
};

use super::{
    MaybeBytes, StorageError, StoreKey, StoreKeyMutex, StoreKeys, StoreKeysPrefixes, StorePrefix,
    StorePrefixes,
};

/// Readable storage traits.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the store key is not valid or there is an underlying error
    /// with the store.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Retrieve partial bytes from a list of byte ranges for a store key.
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying storage error or any byte range is
    /// invalid.
    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        let Some(bytes) = self.get(key)? else {
            return Ok(None);
        };
        Ok(Some(extract_byte_ranges(&bytes, byte_ranges)?))
    }

    /// Return the size in bytes of the value at `key`, or [`None`] if the key is not found.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;
}

/// Writable storage traits.
pub trait WritableStorageTraits: Send + Sync {
    /// Store bytes at a [`StoreKey`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on failure to store.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Erase a [`StoreKey`].
    ///
    /// Succeeds if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<(), StorageError>;

    /// Erase all [`StoreKey`] under [`StorePrefix`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError>;
}

/// Listable storage traits.
pub trait ListableStorageTraits: Send + Sync {
    /// Retrieve all [`StoreKeys`] in the store, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an underlying error with the store.
    fn list(&self) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] with a given [`StorePrefix`], sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the prefix is not a directory or there is an underlying
    /// error with the store.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// Retrieve all [`StoreKeys`] and [`StorePrefix`] which are direct children of
    /// [`StorePrefix`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the prefix is not a directory or there is an underlying
    /// error with the store.
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`] and [`WritableStorageTraits`] with locking.
pub trait ReadableWritableStorageTraits: ReadableStorageTraits + WritableStorageTraits {
    /// Return a mutex for exclusive access to the value at `key`.
    ///
    /// Holding the mutex over a get-modify-set sequence makes partial chunk updates atomic with
    /// respect to other users of the same store instance.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the lock cannot be created.
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError>;
}

/// A supertrait of [`ReadableWritableStorageTraits`] and [`ListableStorageTraits`].
pub trait ReadableWritableListableStorageTraits:
    ReadableWritableStorageTraits + ListableStorageTraits
{
}

impl<T: ReadableWritableStorageTraits + ListableStorageTraits> ReadableWritableListableStorageTraits
    for T
{
}

/// Return whether the node at `path` exists (has `zarr.json` metadata).
///
/// # Errors
///
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn node_exists<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<bool, StorageError> {
    Ok(storage.size_key(&meta_key(path))?.is_some())
}

/// Return the prefixes of the direct children of the node at `path`.
///
/// Prefixes with a reserved (`__`) leading name are excluded.
///
/// # Errors
///
/// Returns a [`StorageError`] if there is an underlying error with the store.
pub fn discover_children<TStorage: ?Sized + ListableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<StorePrefixes, StorageError> {
    let prefix: StorePrefix = path.try_into().map_err(|_| {
        StorageError::Other(format!("the node path {path} is not a valid store prefix"))
    })?;
    Ok(storage
        .list_dir(&prefix)?
        .prefixes()
        .iter()
        .filter(|child| {
            let name = child
                .as_str()
                .strip_prefix(prefix.as_str())
                .unwrap_or(child.as_str());
            !name.starts_with("__")
        })
        .cloned()
        .collect())
}

/// Retrieve the children of the node at `path` as [`Node`]s, recursively.
///
/// A child prefix without `zarr.json` metadata is interpreted as a group with default metadata.
///
/// # Errors
///
/// Returns a [`StorageError`] if there is an underlying error with the store, or
/// [`StorageError::InvalidMetadata`] if any metadata cannot be parsed.
pub fn get_child_nodes<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits>(
    storage: &Arc<TStorage>,
    path: &NodePath,
) -> Result<Vec<Node>, StorageError> {
    let child_prefixes = discover_children(storage.as_ref(), path)?;
    let mut nodes = Vec::with_capacity(child_prefixes.len());
    for prefix in &child_prefixes {
        let child_path: NodePath = prefix.try_into().map_err(|_| {
            StorageError::Other(format!("the store prefix {prefix} is not a valid node path"))
        })?;
        let key = meta_key(&child_path);
        let child_metadata = match storage.get(&key)? {
            Some(metadata) => serde_json::from_slice::<NodeMetadata>(&metadata)
                .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?,
            None => NodeMetadata::Group(crate::metadata::GroupMetadata::default()),
        };
        let children = match child_metadata {
            NodeMetadata::Array(_) => Vec::default(),
            NodeMetadata::Group(_) => get_child_nodes(storage, &child_path)?,
        };
        nodes.push(Node::new_with_metadata(child_path, child_metadata, children));
    }
    Ok(nodes)
}
