//! Zarr groups.
//!
//! A group is an interior node of the hierarchy. Its `zarr.json` holds only attributes; children
//! are discovered by listing the store, never recorded inline.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#group-metadata>.

use std::sync::Arc;

use thiserror::Error;

pub use crate::metadata::GroupMetadata;

use crate::{
    metadata::{AdditionalFields, UnsupportedAdditionalFieldError},
    node::{NodePath, NodePathError},
    storage::{meta_key, ReadableStorageTraits, StorageError, WritableStorageTraits},
};

/// A group creation error.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// Invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An unsupported additional field in the group metadata.
    #[error(transparent)]
    UnsupportedAdditionalFieldError(#[from] UnsupportedAdditionalFieldError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The group metadata is missing.
    #[error("group metadata is missing at {_0}")]
    MissingMetadata(String),
    /// The group metadata cannot be deserialized.
    #[error("invalid group metadata: {_0}")]
    InvalidMetadata(#[from] serde_json::Error),
}

/// A Zarr group.
pub struct Group<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    path: NodePath,
    attributes: serde_json::Map<String, serde_json::Value>,
    additional_fields: AdditionalFields,
}

impl<TStorage: ?Sized> Group<TStorage> {
    /// Create a group at `path` of `storage` from `metadata`.
    ///
    /// The metadata is interpreted but not written; use
    /// [`store_metadata`](Group::store_metadata) to persist it.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if the path or metadata is invalid.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: GroupMetadata,
    ) -> Result<Self, GroupCreateError> {
        let path = NodePath::new(path)?;
        metadata.additional_fields.validate()?;
        Ok(Self {
            storage,
            path,
            attributes: metadata.attributes,
            additional_fields: metadata.additional_fields,
        })
    }

    /// Create a group at `path` of `storage` with default metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if the path is invalid.
    pub fn new(storage: Arc<TStorage>, path: &str) -> Result<Self, GroupCreateError> {
        Self::new_with_metadata(storage, path, GroupMetadata::default())
    }

    /// The path of the group.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The user attributes of the group.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Mutably borrow the user attributes of the group.
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.attributes
    }

    /// Create the metadata of the group.
    #[must_use]
    pub fn metadata(&self) -> GroupMetadata {
        let mut metadata = GroupMetadata::new().with_attributes(self.attributes.clone());
        metadata.additional_fields = self.additional_fields.clone();
        metadata
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Group<TStorage> {
    /// Open an existing group at `path` of `storage` by reading its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GroupCreateError`] if the metadata is missing or cannot be parsed.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, GroupCreateError> {
        let node_path = NodePath::new(path)?;
        let key = meta_key(&node_path);
        let metadata_bytes = storage
            .get(&key)?
            .ok_or_else(|| GroupCreateError::MissingMetadata(path.to_string()))?;
        let metadata: GroupMetadata = serde_json::from_slice(&metadata_bytes)?;
        Self::new_with_metadata(storage, path, metadata)
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> Group<TStorage> {
    /// Write the `zarr.json` metadata of the group.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the metadata cannot be stored.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        let key = meta_key(&self.path);
        self.storage
            .set(&key, self.metadata().to_string_pretty().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;

    #[test]
    fn group_round_trip() {
        let storage = Arc::new(MemoryStore::new());
        let mut group = Group::new(storage.clone(), "/a").unwrap();
        group
            .attributes_mut()
            .insert("series".to_string(), 2.into());
        group.store_metadata().unwrap();

        let group = Group::open(storage, "/a").unwrap();
        assert_eq!(group.attributes().get("series"), Some(&2.into()));
    }

    #[test]
    fn group_open_missing() {
        let storage = Arc::new(MemoryStore::new());
        assert!(matches!(
            Group::open(storage, "/a"),
            Err(GroupCreateError::MissingMetadata(_))
        ));
    }

    #[test]
    fn group_invalid_path() {
        let storage = Arc::new(MemoryStore::new());
        assert!(Group::new(storage, "a/b").is_err());
    }
}
