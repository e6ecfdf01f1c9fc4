use thiserror::Error;

use crate::{
    array_subset::{
        ArraySubset, IncompatibleArraySubsetAndShapeError, IncompatibleDimensionalityError,
    },
    layout::LayoutError,
    metadata::UnsupportedAdditionalFieldError,
    node::NodePathError,
    plugin::PluginCreateError,
    storage::StorageError,
};

use super::{
    codec::CodecError, ArrayShape, IncompatibleFillValueError, IncompatibleFillValueMetadataError,
    UnsupportedDataTypeError,
};

/// An array creation error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// Invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// Unsupported data type.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// Invalid fill value metadata.
    #[error(transparent)]
    InvalidFillValueMetadata(#[from] IncompatibleFillValueMetadataError),
    /// Invalid fill value.
    #[error(transparent)]
    InvalidFillValue(#[from] IncompatibleFillValueError),
    /// Error creating the chunk grid.
    #[error("chunk grid: {_0}")]
    ChunkGridCreateError(PluginCreateError),
    /// Error creating the chunk key encoding.
    #[error("chunk key encoding: {_0}")]
    ChunkKeyEncodingCreateError(PluginCreateError),
    /// Error creating the codec chain.
    #[error("codecs: {_0}")]
    CodecsCreateError(PluginCreateError),
    /// The chunk grid dimensionality does not match the array shape.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// An unsupported additional field in the array metadata.
    #[error(transparent)]
    UnsupportedAdditionalFieldError(#[from] UnsupportedAdditionalFieldError),
    /// A layout derivation error.
    #[error(transparent)]
    LayoutError(#[from] LayoutError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The array metadata is missing.
    #[error("array metadata is missing at {_0}")]
    MissingMetadata(String),
    /// The array metadata cannot be deserialized.
    #[error("invalid array metadata: {_0}")]
    InvalidMetadata(#[from] serde_json::Error),
}

/// An array operation error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionalityError(#[from] IncompatibleDimensionalityError),
    /// An incompatible array subset and shape.
    #[error(transparent)]
    IncompatibleArraySubsetAndShapeError(#[from] IncompatibleArraySubsetAndShapeError),
    /// Invalid chunk grid indices.
    #[error("invalid chunk grid indices {_0:?}")]
    InvalidChunkGridIndicesError(Vec<u64>),
    /// An array subset is out of bounds of the array.
    #[error("array subset {_0} is out of bounds of array shape {_1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// An input buffer does not have the expected size.
    #[error("input of {_0} bytes does not match the expected {_1} bytes")]
    InvalidBytesInputSize(usize, u64),
    /// An element type size does not match the array data type size.
    #[error("element size {got} does not match the data type size {expected}")]
    InvalidElementSize {
        /// The element size of the input or output type.
        got: usize,
        /// The data type size of the array.
        expected: usize,
    },
}
