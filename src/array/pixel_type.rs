//! Imaging pixel types.
//!
//! A [`PixelType`] is the element type of an image plane as seen by imaging callers, a strict
//! subset of the storage [`DataType`]s. Converting a data type back to a pixel type is how an
//! opened array reports its element type; see [`PixelType::from_data_type`].

use thiserror::Error;

use super::DataType;

/// The element type of an image pixel buffer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PixelType {
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// IEEE 754 single-precision float.
    Float32,
    /// IEEE 754 double-precision float.
    Float64,
}

/// An array data type with no pixel type counterpart.
#[derive(Debug, Error)]
#[error("data type {0} has no pixel type representation")]
pub struct UnsupportedElementTypeError(DataType);

impl UnsupportedElementTypeError {
    /// Return the offending data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.0
    }
}

impl PixelType {
    /// Returns the storage data type of the pixel type.
    #[must_use]
    pub const fn to_data_type(self) -> DataType {
        match self {
            Self::Int8 => DataType::Int8,
            Self::Int16 => DataType::Int16,
            Self::Int32 => DataType::Int32,
            Self::UInt8 => DataType::UInt8,
            Self::UInt16 => DataType::UInt16,
            Self::UInt32 => DataType::UInt32,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
        }
    }

    /// Returns the pixel type corresponding to an array data type.
    ///
    /// 64-bit integer arrays are intentionally reported as [`PixelType::Float64`]: imaging
    /// pipelines have no 64-bit integer pixel representation, so values are carried as doubles.
    /// Integers of magnitude above 2^53 lose precision under this mapping.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedElementTypeError`] for data types with no pixel representation
    /// ([`DataType::Bool`]).
    pub const fn from_data_type(data_type: DataType) -> Result<Self, UnsupportedElementTypeError> {
        match data_type {
            DataType::Int8 => Ok(Self::Int8),
            DataType::Int16 => Ok(Self::Int16),
            DataType::Int32 => Ok(Self::Int32),
            DataType::UInt8 => Ok(Self::UInt8),
            DataType::UInt16 => Ok(Self::UInt16),
            DataType::UInt32 => Ok(Self::UInt32),
            DataType::Float32 => Ok(Self::Float32),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => Ok(Self::Float64),
            DataType::Bool => Err(UnsupportedElementTypeError(data_type)),
        }
    }

    /// Returns the size in bytes of a pixel of this type.
    #[must_use]
    pub const fn size(self) -> usize {
        self.to_data_type().size()
    }
}

impl core::fmt::Display for PixelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_data_type().identifier())
    }
}
