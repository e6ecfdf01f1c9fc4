//! An array builder.

use std::sync::Arc;

use crate::{
    layout::{ChunkLayout, ShardStrategy},
    metadata::{ArrayMetadata, Metadata},
};

use super::{
    codec::{BytesCodec, CodecChain, CodecTraits, ShardingCodec},
    Array, ArrayCreateError, ArrayShape, ChunkShape, DataType, DefaultChunkKeyEncoding,
    FillValueMetadata, RegularChunkGrid,
};

/// An [`Array`] builder.
///
/// The builder runs the requested chunk shape and shard strategy through
/// [`ChunkLayout::derive`]: when sharding is active the chunk grid of the created array holds the
/// shard shape (the stored unit) and a `sharding_indexed` codec carries the inner chunk shape and
/// inner codec chain; otherwise the chunk grid holds the chunk shape directly. Bytes to bytes
/// codecs (compressors, checksums) are supplied as metadata so callers can resolve them by name
/// through the codec registry.
///
/// ```
/// # use std::sync::Arc;
/// use zarr_pyramid::array::{ArrayBuilder, DataType, FillValueMetadata};
/// use zarr_pyramid::layout::ShardStrategy;
/// use zarr_pyramid::storage::store::MemoryStore;
///
/// let array = ArrayBuilder::new(
///     vec![100, 100],
///     DataType::UInt16,
///     vec![10, 10],
///     FillValueMetadata::UInt(0),
/// )
/// .shard_strategy(Some(ShardStrategy::Superchunk))
/// .build(Arc::new(MemoryStore::new()), "/image")
/// .unwrap();
/// assert_eq!(array.chunk_grid().chunk_shape().to_array_shape(), vec![20, 20]);
/// assert_eq!(array.inner_chunk_shape(), vec![10, 10]);
/// ```
#[derive(Clone, Debug)]
pub struct ArrayBuilder {
    shape: ArrayShape,
    data_type: DataType,
    chunk_shape: Vec<u64>,
    fill_value: FillValueMetadata,
    shard_strategy: Option<ShardStrategy>,
    bytes_to_bytes_codecs: Vec<Metadata>,
    attributes: serde_json::Map<String, serde_json::Value>,
    dimension_names: Option<Vec<Option<String>>>,
}

impl ArrayBuilder {
    /// Create a new array builder for an array of `shape` and `data_type` with chunks of
    /// `chunk_shape` and `fill_value`.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        data_type: DataType,
        chunk_shape: Vec<u64>,
        fill_value: FillValueMetadata,
    ) -> Self {
        Self {
            shape,
            data_type,
            chunk_shape,
            fill_value,
            shard_strategy: None,
            bytes_to_bytes_codecs: Vec::new(),
            attributes: serde_json::Map::new(),
            dimension_names: None,
        }
    }

    /// Set the shard strategy. [`None`] (the default) disables sharding.
    #[must_use]
    pub fn shard_strategy(mut self, shard_strategy: Option<ShardStrategy>) -> Self {
        self.shard_strategy = shard_strategy;
        self
    }

    /// Set the bytes to bytes codecs applied after the array to bytes codec.
    #[must_use]
    pub fn bytes_to_bytes_codecs(mut self, codecs: Vec<Metadata>) -> Self {
        self.bytes_to_bytes_codecs = codecs;
        self
    }

    /// Set the user attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: serde_json::Map<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the dimension names.
    #[must_use]
    pub fn dimension_names(mut self, dimension_names: Option<Vec<Option<String>>>) -> Self {
        self.dimension_names = dimension_names;
        self
    }

    /// Create the metadata the built array will hold.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayCreateError`] if the layout cannot be derived or the codecs are invalid.
    #[allow(clippy::missing_panics_doc)]
    pub fn build_metadata(&self) -> Result<ArrayMetadata, ArrayCreateError> {
        let layout = ChunkLayout::derive(
            &self.shape,
            &self.chunk_shape,
            self.shard_strategy.as_ref(),
        )?;

        // derived chunk and shard dimensions are clamped to at least one
        let stored_unit_shape = ChunkShape::try_from(layout.stored_unit_shape())
            .expect("derived stored unit dimensions are nonzero");

        let mut codecs: Vec<Metadata> = Vec::with_capacity(1 + self.bytes_to_bytes_codecs.len());
        if layout.shard_shape.is_some() {
            let inner_chunk_shape = ChunkShape::try_from(layout.chunk_shape.as_slice())
                .expect("derived chunk dimensions are nonzero");
            let mut inner_codecs = vec![BytesCodec::little().create_metadata()];
            inner_codecs.extend(self.bytes_to_bytes_codecs.iter().cloned());
            let inner_chain = CodecChain::from_metadata(&inner_codecs)
                .map_err(ArrayCreateError::CodecsCreateError)?;
            codecs.push(ShardingCodec::new(inner_chunk_shape, inner_chain).create_metadata());
        } else {
            codecs.push(BytesCodec::little().create_metadata());
            codecs.extend(self.bytes_to_bytes_codecs.iter().cloned());
        }

        Ok(ArrayMetadata::new(
            self.shape.clone(),
            self.data_type.metadata(),
            RegularChunkGrid::new(stored_unit_shape).create_metadata(),
            DefaultChunkKeyEncoding::default().create_metadata(),
            self.fill_value,
            codecs,
        )
        .with_attributes(self.attributes.clone())
        .with_dimension_names(self.dimension_names.clone()))
    }

    /// Build an [`Array`] at `path` of `storage`.
    ///
    /// The array metadata is not written to the store; use
    /// [`store_metadata`](Array::store_metadata) on the built array.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayCreateError`] if the layout, metadata, or codecs are invalid.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        Array::new_with_metadata(storage, path, self.build_metadata()?)
    }
}
