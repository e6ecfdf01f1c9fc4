//! A filesystem store.
//!
//! Store keys map directly to file paths below a base directory, so a hierarchy written through
//! this store is readable by any Zarr V3 implementation pointed at the same directory.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/stores/filesystem/v1.0.html>.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    byte_range::ByteRange,
    storage::{
        ListableStorageTraits, MaybeBytes, ReadableStorageTraits, ReadableWritableStorageTraits,
        StorageError, StoreKey, StoreKeyError, StoreKeyMutex, StoreKeys, StoreKeysPrefixes,
        StoreLocks, StorePrefix, StorePrefixes, WritableStorageTraits,
    },
};

/// A synchronous filesystem store.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    locks: StoreLocks,
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The base path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

impl FilesystemStore {
    /// Create a new filesystem store at `base_path`.
    ///
    /// The base directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`FilesystemStoreCreateError`] if `base_path` is not valid or points to an
    /// existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }
        if base_path.is_file() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            locks: StoreLocks::new(),
        })
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    /// Maps a filesystem path to a [`StoreKey`].
    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let path = path.strip_prefix(&self.base_path).map_err(|_| {
            StoreKeyError::from(path.to_string_lossy().into_owned())
        })?;
        let components: Vec<_> = path
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect();
        StoreKey::new(components.join("/"))
    }

    /// Maps a [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fspath(&self, prefix: &StorePrefix) -> PathBuf {
        self.base_path.join(prefix.as_str())
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        match std::fs::read(self.key_to_fspath(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Vec<u8>>>, StorageError> {
        let mut file = match File::open(self.key_to_fspath(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let size = file.metadata()?.len();
        let mut out = Vec::with_capacity(byte_ranges.len());
        for byte_range in byte_ranges {
            let (ByteRange::FromStart(offset, length) | ByteRange::FromEnd(offset, length)) =
                byte_range;
            if offset + length.unwrap_or(0) > size {
                return Err(crate::byte_range::InvalidByteRangeError::new(
                    *byte_range,
                    size,
                )
                .into());
            }
            file.seek(SeekFrom::Start(byte_range.start(size)))?;
            let length = usize::try_from(byte_range.length(size))
                .map_err(|err| StorageError::Other(err.to_string()))?;
            let mut bytes = vec![0; length];
            file.read_exact(&mut bytes)?;
            out.push(bytes);
        }
        Ok(Some(out))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let key_path = self.key_to_fspath(key);
        std::fs::metadata(key_path).map_or(Ok(None), |metadata| Ok(Some(metadata.len())))
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(key_path)?;
        file.write_all(value)?;
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        match std::fs::remove_file(self.key_to_fspath(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        match std::fs::remove_dir_all(self.prefix_to_fspath(prefix)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(&self.base_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|v| v.path().is_file())
            .filter_map(|v| self.fspath_to_key(v.path()).ok())
            .collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        Ok(WalkDir::new(self.prefix_to_fspath(prefix))
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|v| v.path().is_file())
            .filter_map(|v| self.fspath_to_key(v.path()).ok())
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: StorePrefixes = vec![];
        if let Ok(dir) = std::fs::read_dir(self.prefix_to_fspath(prefix)) {
            for entry in dir {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_dir() {
                    prefixes.push(StorePrefix::new(
                        prefix.as_str().to_string() + &name + "/",
                    )?);
                } else {
                    keys.push(StoreKey::new(prefix.as_str().to_string() + &name)?);
                }
            }
        }
        keys.sort();
        prefixes.sort();
        Ok(StoreKeysPrefixes::new(keys, prefixes))
    }
}

impl ReadableWritableStorageTraits for FilesystemStore {
    fn mutex(&self, key: &StoreKey) -> Result<StoreKeyMutex, StorageError> {
        Ok(self.locks.mutex(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn filesystem_set_get() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;

        let key = "a/b".try_into()?;
        store.set(&key, &[0, 1, 2, 3])?;
        assert_eq!(store.get(&key)?.unwrap(), &[0, 1, 2, 3]);
        assert_eq!(store.size_key(&key)?, Some(4));
        assert!(store.get(&"a/c".try_into()?)?.is_none());

        assert_eq!(
            store
                .get_partial_values_key(
                    &key,
                    &[ByteRange::FromStart(1, Some(2)), ByteRange::FromEnd(0, Some(1))]
                )?
                .unwrap(),
            vec![vec![1, 2], vec![3]]
        );
        assert!(store
            .get_partial_values_key(&key, &[ByteRange::FromStart(3, Some(4))])
            .is_err());

        store.erase(&key)?;
        assert!(store.get(&key)?.is_none());
        store.erase(&key)?;
        Ok(())
    }

    #[test]
    fn filesystem_list() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;

        store.set(&"a/b".try_into()?, &[])?;
        store.set(&"a/c".try_into()?, &[])?;
        store.set(&"a/d/e".try_into()?, &[])?;
        store.set(&"b/f".try_into()?, &[])?;

        assert_eq!(
            store.list()?,
            &[
                "a/b".try_into()?,
                "a/c".try_into()?,
                "a/d/e".try_into()?,
                "b/f".try_into()?
            ]
        );
        assert_eq!(
            store.list_prefix(&"a/".try_into()?)?,
            &["a/b".try_into()?, "a/c".try_into()?, "a/d/e".try_into()?]
        );

        let list_dir = store.list_dir(&"a/".try_into()?)?;
        assert_eq!(list_dir.keys(), &["a/b".try_into()?, "a/c".try_into()?]);
        assert_eq!(list_dir.prefixes(), &["a/d/".try_into()?]);

        store.erase_prefix(&"a/".try_into()?)?;
        assert_eq!(store.list()?, &["b/f".try_into()?]);
        Ok(())
    }
}
