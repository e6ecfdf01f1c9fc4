//! Zarr arrays.
//!
//! An [`Array`] is a handle over a storage backend for one array node: its `zarr.json` metadata
//! plus the chunk grid, chunk key encoding, fill value, and codec chain derived from it. Chunked
//! region I/O is provided by the [`array_read`] and [`array_write`] method groups.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#array-metadata>.

mod array_builder;
mod array_errors;
mod array_read;
mod array_representation;
mod array_write;
mod chunk_grid;
mod chunk_key_encoding;
mod chunk_shape;
pub mod codec;
mod data_type;
mod fill_value;
mod pixel_type;

use std::sync::Arc;

pub use array_builder::ArrayBuilder;
pub use array_errors::{ArrayCreateError, ArrayError};
pub use array_representation::ArrayRepresentation;
pub use chunk_grid::{RegularChunkGrid, RegularChunkGridConfiguration};
pub use chunk_key_encoding::{
    ChunkKeySeparator, DefaultChunkKeyEncoding, DefaultChunkKeyEncodingConfiguration,
};
pub use chunk_shape::ChunkShape;
pub use data_type::{
    DataType, IncompatibleFillValueError, IncompatibleFillValueMetadataError,
    UnsupportedDataTypeError,
};
pub use fill_value::{FillValue, FillValueFloatStringNonFinite, FillValueMetadata};
pub use pixel_type::{PixelType, UnsupportedElementTypeError};

use codec::CodecChain;

use crate::{
    array_subset::ArraySubset,
    metadata::{AdditionalFields, ArrayMetadata},
    node::NodePath,
    storage::{data_key, meta_key, ReadableStorageTraits, StoreKey},
};

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The indices of a chunk or element of an array.
pub type ArrayIndices = Vec<u64>;

/// A Zarr array.
///
/// The handle is parameterised by its storage; operations are available according to the storage
/// traits it supports (readable, writable, or both).
pub struct Array<TStorage: ?Sized> {
    /// The storage backend.
    storage: Arc<TStorage>,
    /// The path of the array in the store.
    path: NodePath,
    /// The shape of the array.
    shape: ArrayShape,
    /// The data type of the array.
    data_type: DataType,
    /// The chunk grid (the stored unit shape when sharding is active).
    chunk_grid: RegularChunkGrid,
    /// The mapping from chunk indices to store keys.
    chunk_key_encoding: DefaultChunkKeyEncoding,
    /// The fill value of uninitialised elements.
    fill_value: FillValue,
    /// The codec chain encoding and decoding stored units.
    codecs: CodecChain,
    /// User attributes.
    attributes: serde_json::Map<String, serde_json::Value>,
    /// Optional dimension names.
    dimension_names: Option<Vec<Option<String>>>,
    /// Additional metadata fields (must not be required for data retrieval).
    additional_fields: AdditionalFields,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array at `path` of `storage` from `metadata`.
    ///
    /// The metadata is interpreted but not written; use
    /// [`store_metadata`](Array::store_metadata) to persist it.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayCreateError`] if any component of the metadata is invalid or unsupported.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        metadata.additional_fields.validate()?;
        let data_type = DataType::from_metadata(&metadata.data_type)?;
        let chunk_grid = RegularChunkGrid::from_metadata(&metadata.chunk_grid)
            .map_err(ArrayCreateError::ChunkGridCreateError)?;
        // a rank mismatch must fail before any node exists
        chunk_grid.grid_shape(&metadata.shape)?;
        let chunk_key_encoding = DefaultChunkKeyEncoding::from_metadata(&metadata.chunk_key_encoding)
            .map_err(ArrayCreateError::ChunkKeyEncodingCreateError)?;
        let fill_value = data_type.fill_value_from_metadata(&metadata.fill_value)?;
        let codecs = CodecChain::from_metadata(&metadata.codecs)
            .map_err(ArrayCreateError::CodecsCreateError)?;
        Ok(Self {
            storage,
            path,
            shape: metadata.shape,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes: metadata.attributes,
            dimension_names: metadata.dimension_names,
            additional_fields: metadata.additional_fields,
        })
    }

    /// The path of the array.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// The shape of the array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// The data type of the array.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The chunk grid of the array.
    ///
    /// When sharding is active the grid cells are the stored units (shards), and
    /// [`inner_chunk_shape`](Array::inner_chunk_shape) exposes the chunks within them.
    #[must_use]
    pub const fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// The fill value of the array.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// The codec chain of the array.
    #[must_use]
    pub const fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// The user attributes of the array.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Mutably borrow the user attributes of the array.
    pub fn attributes_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.attributes
    }

    /// The dimension names of the array.
    #[must_use]
    pub const fn dimension_names(&self) -> &Option<Vec<Option<String>>> {
        &self.dimension_names
    }

    /// The inner chunk shape: the sharding codec chunk shape when sharding is active, otherwise
    /// the chunk grid shape.
    #[must_use]
    pub fn inner_chunk_shape(&self) -> Vec<u64> {
        self.codecs
            .array_to_bytes_codec()
            .inner_chunk_shape()
            .map_or_else(
                || self.chunk_grid.chunk_shape().to_array_shape(),
                |chunk_shape| chunk_shape.to_array_shape(),
            )
    }

    /// Create the metadata of the array.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn metadata(&self) -> ArrayMetadata {
        let mut metadata = ArrayMetadata::new(
            self.shape.clone(),
            self.data_type.metadata(),
            self.chunk_grid.create_metadata(),
            self.chunk_key_encoding.create_metadata(),
            self.data_type
                .metadata_fill_value(&self.fill_value)
                .expect("the fill value was validated against the data type"),
            self.codecs.create_metadatas(),
        )
        .with_attributes(self.attributes.clone())
        .with_dimension_names(self.dimension_names.clone());
        metadata.additional_fields = self.additional_fields.clone();
        metadata
    }

    /// The shape of the chunk grid (number of chunks per dimension).
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        self.chunk_grid
            .grid_shape(&self.shape)
            .expect("the grid dimensionality was validated at construction")
    }

    /// The store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        data_key(&self.path, &self.chunk_key_encoding.encode(chunk_indices))
    }

    /// The array subset covered by the chunk at `chunk_indices` (which may overhang the array
    /// shape on the last chunk of each dimension).
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidChunkGridIndicesError`] if `chunk_indices` are outside the
    /// chunk grid.
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> Result<ArraySubset, ArrayError> {
        let grid_shape = self.chunk_grid_shape();
        if chunk_indices.len() != grid_shape.len()
            || std::iter::zip(chunk_indices, &grid_shape).any(|(index, size)| index >= size)
        {
            return Err(ArrayError::InvalidChunkGridIndicesError(
                chunk_indices.to_vec(),
            ));
        }
        Ok(self.chunk_grid.chunk_subset(chunk_indices)?)
    }

    /// The representation of one stored chunk.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn chunk_array_representation(&self) -> ArrayRepresentation {
        ArrayRepresentation::new(
            self.chunk_grid.chunk_shape().to_array_shape(),
            self.data_type,
            self.fill_value.clone(),
        )
        .expect("the fill value was validated against the data type")
    }

    /// The subset spanning the entire array.
    #[must_use]
    pub fn subset_all(&self) -> ArraySubset {
        ArraySubset::new_with_shape(self.shape.clone())
    }

    /// The chunks intersecting `array_subset`, as a subset of chunk indices.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if the dimensionality of `array_subset` does not match the array.
    pub fn chunks_in_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ArraySubset, ArrayError> {
        Ok(self.chunk_grid.chunks_in_array_subset(array_subset)?)
    }

    fn fill_value_chunk_bytes(&self) -> Vec<u8> {
        let num_elements = usize::try_from(self.chunk_grid.chunk_shape().num_elements())
            .expect("chunk element count fits in usize");
        self.fill_value.as_ne_bytes().repeat(num_elements)
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Array<TStorage> {
    /// Open an existing array at `path` of `storage` by reading its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayCreateError`] if the metadata is missing, cannot be parsed, or holds an
    /// unsupported component.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, ArrayCreateError> {
        let node_path = NodePath::new(path)?;
        let key = meta_key(&node_path);
        let metadata_bytes = storage
            .get(&key)?
            .ok_or_else(|| ArrayCreateError::MissingMetadata(path.to_string()))?;
        let metadata: ArrayMetadata = serde_json::from_slice(&metadata_bytes)?;
        Self::new_with_metadata(storage, path, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;

    fn array_metadata() -> ArrayMetadata {
        ArrayMetadata::try_from(
            r#"{
                "zarr_format": 3,
                "node_type": "array",
                "shape": [10, 10],
                "data_type": "uint8",
                "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [5, 5]}},
                "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
                "fill_value": 0,
                "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn array_from_metadata() {
        let storage = Arc::new(MemoryStore::new());
        let array = Array::new_with_metadata(storage, "/image", array_metadata()).unwrap();
        assert_eq!(array.shape(), &[10, 10]);
        assert_eq!(array.dimensionality(), 2);
        assert_eq!(array.data_type(), DataType::UInt8);
        assert_eq!(array.chunk_grid_shape(), vec![2, 2]);
        assert_eq!(array.inner_chunk_shape(), vec![5, 5]);
        assert_eq!(
            array.chunk_key(&[1, 0]),
            StoreKey::new("image/c/1/0").unwrap()
        );
    }

    #[test]
    fn array_metadata_round_trip() {
        let storage = Arc::new(MemoryStore::new());
        let array = Array::new_with_metadata(storage, "/image", array_metadata()).unwrap();
        assert_eq!(array.metadata(), array_metadata());
    }

    #[test]
    fn array_rejects_rank_mismatch() {
        let mut metadata = array_metadata();
        metadata.shape = vec![10, 10, 10];
        let storage = Arc::new(MemoryStore::new());
        assert!(matches!(
            Array::new_with_metadata(storage, "/image", metadata),
            Err(ArrayCreateError::IncompatibleDimensionalityError(_))
        ));
    }

    #[test]
    fn array_rejects_unknown_data_type() {
        let mut metadata = array_metadata();
        metadata.data_type = crate::metadata::Metadata::new("complex128");
        let storage = Arc::new(MemoryStore::new());
        assert!(matches!(
            Array::new_with_metadata(storage, "/image", metadata),
            Err(ArrayCreateError::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn array_open_missing() {
        let storage = Arc::new(MemoryStore::new());
        assert!(matches!(
            Array::open(storage, "/image"),
            Err(ArrayCreateError::MissingMetadata(_))
        ));
    }
}
