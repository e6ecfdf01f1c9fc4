//! The imaging service façade.
//!
//! An [`ImageStore`] wraps a storage backend and exposes the operations an imaging caller needs:
//! opening arrays as explicit handles, reading and writing N-dimensional pixel regions as typed
//! [`PixelBuffer`]s, querying hierarchy attributes and children, and creating multi-resolution
//! pyramids.
//!
//! Pixel regions are addressed by `shape` and `offset` in element coordinates. Arrays with
//! 64-bit integer elements are surfaced as [`PixelType::Float64`] buffers; values are converted,
//! not reinterpreted, and magnitudes above 2^53 lose precision.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::{
        Array, ArrayCreateError, ArrayError, ArrayShape, DataType, PixelType,
        UnsupportedElementTypeError,
    },
    array_subset::ArraySubset,
    group::{Group, GroupCreateError},
    node::{NodeMetadata, NodePath},
    pyramid::{create_pyramid, CreateOptions, PyramidCreateError, PyramidDescriptor},
    storage::{
        get_child_nodes, store::FilesystemStore, store::FilesystemStoreCreateError,
        ReadableWritableListableStorage, StorageError,
    },
};

/// A service error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The handle has been closed.
    #[error("the array handle for {path} is not open")]
    NotOpened {
        /// The path of the closed handle.
        path: String,
    },
    /// A region request is out of bounds of the array.
    #[error("region {region} is out of bounds of array shape {array_shape:?}")]
    OutOfBounds {
        /// The requested region.
        region: ArraySubset,
        /// The shape of the array.
        array_shape: ArrayShape,
    },
    /// A pixel buffer type does not match the array element type.
    #[error("pixel buffer of type {got} does not match array element type {expected}")]
    TypeMismatch {
        /// The pixel type of the supplied buffer.
        got: PixelType,
        /// The pixel type of the array.
        expected: PixelType,
    },
    /// The array element type has no pixel representation.
    #[error(transparent)]
    UnsupportedElementType(#[from] UnsupportedElementTypeError),
    /// The store root carries a scheme with no available backend.
    #[error("unrecognized store scheme {scheme}")]
    UnrecognizedScheme {
        /// The scheme of the store root.
        scheme: String,
    },
    /// A filesystem store could not be created.
    #[error(transparent)]
    StoreCreateError(#[from] FilesystemStoreCreateError),
    /// Array error.
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    /// An array could not be created or opened.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// A group could not be created or opened.
    #[error(transparent)]
    GroupCreateError(#[from] GroupCreateError),
    /// A pyramid could not be created.
    #[error(transparent)]
    PyramidCreateError(#[from] PyramidCreateError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// A dense, row-major pixel buffer carrying its shape, one variant per pixel type.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    /// Signed 8-bit pixels.
    Int8 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<i8>,
    },
    /// Signed 16-bit pixels.
    Int16 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<i16>,
    },
    /// Signed 32-bit pixels.
    Int32 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<i32>,
    },
    /// Unsigned 8-bit pixels.
    UInt8 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<u8>,
    },
    /// Unsigned 16-bit pixels.
    UInt16 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<u16>,
    },
    /// Unsigned 32-bit pixels.
    UInt32 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<u32>,
    },
    /// Single-precision float pixels.
    Float32 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<f32>,
    },
    /// Double-precision float pixels.
    Float64 {
        /// The shape of the buffer.
        shape: Vec<u64>,
        /// The pixels, row-major.
        data: Vec<f64>,
    },
}

impl PixelBuffer {
    /// The pixel type of the buffer.
    #[must_use]
    pub const fn pixel_type(&self) -> PixelType {
        match self {
            Self::Int8 { .. } => PixelType::Int8,
            Self::Int16 { .. } => PixelType::Int16,
            Self::Int32 { .. } => PixelType::Int32,
            Self::UInt8 { .. } => PixelType::UInt8,
            Self::UInt16 { .. } => PixelType::UInt16,
            Self::UInt32 { .. } => PixelType::UInt32,
            Self::Float32 { .. } => PixelType::Float32,
            Self::Float64 { .. } => PixelType::Float64,
        }
    }

    /// The shape of the buffer.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        match self {
            Self::Int8 { shape, .. }
            | Self::Int16 { shape, .. }
            | Self::Int32 { shape, .. }
            | Self::UInt8 { shape, .. }
            | Self::UInt16 { shape, .. }
            | Self::UInt32 { shape, .. }
            | Self::Float32 { shape, .. }
            | Self::Float64 { shape, .. } => shape,
        }
    }

    /// The number of pixels of the buffer shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape().iter().product()
    }
}

/// An image store over a storage backend.
pub struct ImageStore {
    storage: ReadableWritableListableStorage,
}

impl ImageStore {
    /// Create an image store rooted at `root`.
    ///
    /// A plain path (or a `file://` prefix) opens a [`FilesystemStore`]. Any other
    /// URL-like scheme logs a warning and is refused.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UnrecognizedScheme`] for a scheme with no available backend, or
    /// [`ServiceError::StoreCreateError`] if the filesystem store cannot be created.
    pub fn new(root: &str) -> Result<Self, ServiceError> {
        let path = match root.split_once("://") {
            Some(("file", path)) => path,
            Some((scheme, _)) => {
                log::warn!(
                    "no backend is available for store scheme {scheme}, \
                     only local filesystem paths are supported"
                );
                return Err(ServiceError::UnrecognizedScheme {
                    scheme: scheme.to_string(),
                });
            }
            None => root,
        };
        Ok(Self::new_with_store(Arc::new(FilesystemStore::new(path)?)))
    }

    /// Create an image store over an existing storage backend.
    #[must_use]
    pub fn new_with_store(storage: ReadableWritableListableStorage) -> Self {
        Self { storage }
    }

    /// Open the array at `path` as an [`ArrayHandle`].
    ///
    /// Handles are independent; any number may coexist over the same store.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the array metadata is missing or invalid.
    pub fn open_array(&self, path: &str) -> Result<ArrayHandle, ServiceError> {
        let array = Array::open(self.storage.clone(), path)?;
        Ok(ArrayHandle {
            array,
            path: path.to_string(),
            open: true,
        })
    }

    /// The user attributes of the group at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the group metadata is missing or invalid.
    pub fn group_attributes(
        &self,
        path: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ServiceError> {
        Ok(Group::open(self.storage.clone(), path)?.attributes().clone())
    }

    /// The user attributes of the array at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the array metadata is missing or invalid.
    pub fn array_attributes(
        &self,
        path: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ServiceError> {
        Ok(Array::open(self.storage.clone(), path)?.attributes().clone())
    }

    /// The names of the child groups of the node at `path`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the store cannot be listed or child metadata is invalid.
    pub fn group_children(&self, path: &str) -> Result<Vec<String>, ServiceError> {
        self.children(path, true)
    }

    /// The names of the child arrays of the node at `path`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the store cannot be listed or child metadata is invalid.
    pub fn array_children(&self, path: &str) -> Result<Vec<String>, ServiceError> {
        self.children(path, false)
    }

    fn children(&self, path: &str, groups: bool) -> Result<Vec<String>, ServiceError> {
        let path = NodePath::new(path).map_err(GroupCreateError::from)?;
        let children = get_child_nodes(&self.storage, &path)?;
        Ok(children
            .iter()
            .filter(|node| matches!(node.metadata(), NodeMetadata::Group(_)) == groups)
            .map(|node| node.name().to_string())
            .collect())
    }

    /// Materialise the pyramid described by `descriptor` at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the descriptor is empty or any node cannot be created.
    pub fn create_pyramid(
        &self,
        path: &str,
        descriptor: &PyramidDescriptor,
        options: &CreateOptions,
    ) -> Result<(), ServiceError> {
        Ok(create_pyramid(&self.storage, path, descriptor, options)?)
    }
}

/// An open handle to one array of an [`ImageStore`].
///
/// The caller owns the handle lifetime: [`close`](ArrayHandle::close) flags the handle, and every
/// subsequent operation fails with [`ServiceError::NotOpened`].
pub struct ArrayHandle {
    array: Array<dyn crate::storage::ReadableWritableListableStorageTraits>,
    path: String,
    open: bool,
}

impl ArrayHandle {
    fn ensure_open(&self) -> Result<(), ServiceError> {
        if self.open {
            Ok(())
        } else {
            Err(ServiceError::NotOpened {
                path: self.path.clone(),
            })
        }
    }

    /// Returns true if the handle is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Close the handle. Idempotent.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// The shape of the array.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed.
    pub fn shape(&self) -> Result<&[u64], ServiceError> {
        self.ensure_open()?;
        Ok(self.array.shape())
    }

    /// The chunk shape of the array: the inner chunk shape when sharding is active.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed.
    pub fn chunk_shape(&self) -> Result<Vec<u64>, ServiceError> {
        self.ensure_open()?;
        Ok(self.array.inner_chunk_shape())
    }

    /// The storage data type of the array.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed.
    pub fn data_type(&self) -> Result<DataType, ServiceError> {
        self.ensure_open()?;
        Ok(self.array.data_type())
    }

    /// The pixel type of the array.
    ///
    /// 64-bit integer arrays report [`PixelType::Float64`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed, or
    /// [`ServiceError::UnsupportedElementType`] if the element type has no pixel representation.
    pub fn pixel_type(&self) -> Result<PixelType, ServiceError> {
        self.ensure_open()?;
        Ok(PixelType::from_data_type(self.array.data_type())?)
    }

    /// Read the region of `shape` at `offset` into a typed pixel buffer.
    ///
    /// Unwritten portions of the region read as the array fill value.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed,
    /// [`ServiceError::OutOfBounds`] if the region exceeds the array bounds, or a
    /// [`ServiceError`] on storage and codec failures.
    #[allow(clippy::cast_precision_loss)]
    pub fn read_region(&self, shape: &[u64], offset: &[u64]) -> Result<PixelBuffer, ServiceError> {
        self.ensure_open()?;
        let region = self.region(shape, offset)?;
        let pixel_type = PixelType::from_data_type(self.array.data_type())?;
        let shape = shape.to_vec();
        let buffer = match pixel_type {
            PixelType::Int8 => PixelBuffer::Int8 {
                data: self.array.retrieve_array_subset_elements::<i8>(&region)?,
                shape,
            },
            PixelType::Int16 => PixelBuffer::Int16 {
                data: self.array.retrieve_array_subset_elements::<i16>(&region)?,
                shape,
            },
            PixelType::Int32 => PixelBuffer::Int32 {
                data: self.array.retrieve_array_subset_elements::<i32>(&region)?,
                shape,
            },
            PixelType::UInt8 => PixelBuffer::UInt8 {
                data: self.array.retrieve_array_subset_elements::<u8>(&region)?,
                shape,
            },
            PixelType::UInt16 => PixelBuffer::UInt16 {
                data: self.array.retrieve_array_subset_elements::<u16>(&region)?,
                shape,
            },
            PixelType::UInt32 => PixelBuffer::UInt32 {
                data: self.array.retrieve_array_subset_elements::<u32>(&region)?,
                shape,
            },
            PixelType::Float32 => PixelBuffer::Float32 {
                data: self.array.retrieve_array_subset_elements::<f32>(&region)?,
                shape,
            },
            // 64-bit integer elements are converted to doubles, not reinterpreted
            PixelType::Float64 => PixelBuffer::Float64 {
                data: match self.array.data_type() {
                    DataType::Int64 => self
                        .array
                        .retrieve_array_subset_elements::<i64>(&region)?
                        .into_iter()
                        .map(|value| value as f64)
                        .collect(),
                    DataType::UInt64 => self
                        .array
                        .retrieve_array_subset_elements::<u64>(&region)?
                        .into_iter()
                        .map(|value| value as f64)
                        .collect(),
                    _ => self.array.retrieve_array_subset_elements::<f64>(&region)?,
                },
                shape,
            },
        };
        Ok(buffer)
    }

    /// Write `buffer` to the region of its shape at `offset`.
    ///
    /// The buffer pixel type must equal the array pixel type; there is no implicit numeric
    /// conversion between buffer variants.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotOpened`] if the handle is closed,
    /// [`ServiceError::TypeMismatch`] if the buffer variant does not match the array element
    /// type, [`ServiceError::OutOfBounds`] if the region exceeds the array bounds (checked
    /// before any store write), or a [`ServiceError`] on storage and codec failures.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn write_region(&self, buffer: &PixelBuffer, offset: &[u64]) -> Result<(), ServiceError> {
        self.ensure_open()?;
        let expected = PixelType::from_data_type(self.array.data_type())?;
        if buffer.pixel_type() != expected {
            return Err(ServiceError::TypeMismatch {
                got: buffer.pixel_type(),
                expected,
            });
        }
        let region = self.region(buffer.shape(), offset)?;
        match buffer {
            PixelBuffer::Int8 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::Int16 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::Int32 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::UInt8 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::UInt16 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::UInt32 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::Float32 { data, .. } => {
                self.array.store_array_subset_elements(&region, data)?;
            }
            PixelBuffer::Float64 { data, .. } => match self.array.data_type() {
                DataType::Int64 => {
                    let values: Vec<i64> = data.iter().map(|value| *value as i64).collect();
                    self.array.store_array_subset_elements(&region, &values)?;
                }
                DataType::UInt64 => {
                    let values: Vec<u64> = data.iter().map(|value| *value as u64).collect();
                    self.array.store_array_subset_elements(&region, &values)?;
                }
                _ => self.array.store_array_subset_elements(&region, data)?,
            },
        }
        Ok(())
    }

    fn region(&self, shape: &[u64], offset: &[u64]) -> Result<ArraySubset, ServiceError> {
        let region = ArraySubset::new_with_start_shape(offset.to_vec(), shape.to_vec())
            .map_err(ArrayError::from)?;
        if region.inbounds(self.array.shape()) {
            Ok(region)
        } else {
            Err(ServiceError::OutOfBounds {
                region,
                array_shape: self.array.shape().to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{pyramid::PyramidDescriptor, storage::store::MemoryStore};

    use super::*;

    fn store_with_array() -> ImageStore {
        let store = ImageStore::new_with_store(Arc::new(MemoryStore::new()));
        store
            .create_pyramid(
                "/image",
                &PyramidDescriptor::single(vec![10, 10], PixelType::UInt8),
                &CreateOptions::default(),
            )
            .unwrap();
        store
    }

    #[test]
    fn unrecognized_scheme_refused() {
        assert!(matches!(
            ImageStore::new("s3://bucket/data"),
            Err(ServiceError::UnrecognizedScheme { scheme }) if scheme == "s3"
        ));
    }

    #[test]
    fn closed_handle_rejected() {
        let store = store_with_array();
        let mut handle = store.open_array("/image").unwrap();
        assert!(handle.is_open());
        assert_eq!(handle.shape().unwrap(), &[10, 10]);
        handle.close();
        handle.close();
        assert!(!handle.is_open());
        assert!(matches!(
            handle.shape(),
            Err(ServiceError::NotOpened { path }) if path == "/image"
        ));
        assert!(matches!(
            handle.read_region(&[1, 1], &[0, 0]),
            Err(ServiceError::NotOpened { .. })
        ));
    }

    #[test]
    fn region_round_trip() {
        let store = store_with_array();
        let handle = store.open_array("/image").unwrap();
        let buffer = PixelBuffer::UInt8 {
            shape: vec![2, 3],
            data: vec![1, 2, 3, 4, 5, 6],
        };
        handle.write_region(&buffer, &[4, 5]).unwrap();
        assert_eq!(handle.read_region(&[2, 3], &[4, 5]).unwrap(), buffer);
        // outside the written region the fill value is read
        assert_eq!(
            handle.read_region(&[1, 1], &[0, 0]).unwrap(),
            PixelBuffer::UInt8 {
                shape: vec![1, 1],
                data: vec![0],
            }
        );
    }

    #[test]
    fn type_mismatch_rejected() {
        let store = store_with_array();
        let handle = store.open_array("/image").unwrap();
        let buffer = PixelBuffer::UInt16 {
            shape: vec![1, 1],
            data: vec![1],
        };
        assert!(matches!(
            handle.write_region(&buffer, &[0, 0]),
            Err(ServiceError::TypeMismatch {
                got: PixelType::UInt16,
                expected: PixelType::UInt8,
            })
        ));
    }

    #[test]
    fn out_of_bounds_rejected() {
        let store = store_with_array();
        let handle = store.open_array("/image").unwrap();
        assert!(matches!(
            handle.read_region(&[5, 5], &[8, 8]),
            Err(ServiceError::OutOfBounds { .. })
        ));
        let buffer = PixelBuffer::UInt8 {
            shape: vec![5, 5],
            data: vec![1; 25],
        };
        assert!(matches!(
            handle.write_region(&buffer, &[8, 8]),
            Err(ServiceError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn children_split_by_kind() {
        let store = ImageStore::new_with_store(Arc::new(MemoryStore::new()));
        let descriptor = PyramidDescriptor {
            series: vec![
                crate::pyramid::SeriesDescriptor {
                    resolutions: vec![
                        crate::pyramid::ResolutionDescriptor {
                            shape: vec![10, 10],
                            pixel_type: PixelType::UInt8,
                        },
                        crate::pyramid::ResolutionDescriptor {
                            shape: vec![5, 5],
                            pixel_type: PixelType::UInt8,
                        },
                    ],
                };
                2
            ],
        };
        store
            .create_pyramid("/", &descriptor, &CreateOptions::default())
            .unwrap();
        assert_eq!(store.group_children("/").unwrap(), ["Series0", "Series1"]);
        assert!(store.array_children("/").unwrap().is_empty());
        assert_eq!(
            store.array_children("/Series0").unwrap(),
            ["Resolution0", "Resolution1"]
        );
    }
}
