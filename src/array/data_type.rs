//! Array data types.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#data-types>.

use thiserror::Error;

use crate::metadata::Metadata;

use super::{FillValue, FillValueMetadata};

/// An array data type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error)]
#[error("data type {0} is unsupported")]
pub struct UnsupportedDataTypeError(String);

/// A fill value metadata incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value {1} for data type {0}")]
pub struct IncompatibleFillValueMetadataError(String, FillValueMetadata);

/// A fill value incompatibility error.
#[derive(Debug, Error)]
#[error("incompatible fill value (len {1}) for data type {0}")]
pub struct IncompatibleFillValueError(String, usize);

impl IncompatibleFillValueError {
    /// Create a new incompatible fill value error.
    #[must_use]
    pub fn new(data_type_name: String, fill_value_len: usize) -> Self {
        Self(data_type_name, fill_value_len)
    }
}

impl DataType {
    /// Returns the identifier of the data type.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Returns the size in bytes of an element of the data type.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns the metadata of the data type.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        Metadata::new(self.identifier())
    }

    /// Create a data type from metadata.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedDataTypeError`] if the metadata is not a recognised data type name.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, UnsupportedDataTypeError> {
        if !metadata.configuration_is_none_or_empty() {
            return Err(UnsupportedDataTypeError(metadata.to_string()));
        }
        match metadata.name() {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            name => Err(UnsupportedDataTypeError(name.to_string())),
        }
    }

    /// Create a fill value from its JSON metadata representation.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueMetadataError`] if the fill value is incompatible with the
    /// data type.
    pub fn fill_value_from_metadata(
        &self,
        fill_value: &FillValueMetadata,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        let err =
            || IncompatibleFillValueMetadataError(self.identifier().to_string(), *fill_value);
        match self {
            Self::Bool => match fill_value {
                FillValueMetadata::Bool(bool) => Ok(FillValue::from(*bool)),
                _ => Err(err()),
            },
            Self::Int8 => {
                let int = fill_value.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i8::try_from(int).map_err(|_| err())?))
            }
            Self::Int16 => {
                let int = fill_value.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i16::try_from(int).map_err(|_| err())?))
            }
            Self::Int32 => {
                let int = fill_value.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(i32::try_from(int).map_err(|_| err())?))
            }
            Self::Int64 => {
                let int = fill_value.try_as_int().ok_or_else(err)?;
                Ok(FillValue::from(int))
            }
            Self::UInt8 => {
                let uint = fill_value.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u8::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt16 => {
                let uint = fill_value.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u16::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt32 => {
                let uint = fill_value.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(u32::try_from(uint).map_err(|_| err())?))
            }
            Self::UInt64 => {
                let uint = fill_value.try_as_uint().ok_or_else(err)?;
                Ok(FillValue::from(uint))
            }
            Self::Float32 => {
                let float = fill_value.try_as_float().ok_or_else(err)?;
                #[allow(clippy::cast_possible_truncation)]
                Ok(FillValue::from(float as f32))
            }
            Self::Float64 => {
                let float = fill_value.try_as_float().ok_or_else(err)?;
                Ok(FillValue::from(float))
            }
        }
    }

    /// Create the JSON metadata representation of a fill value.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueError`] if the byte length of `fill_value` does not match
    /// the data type size.
    pub fn metadata_fill_value(
        &self,
        fill_value: &FillValue,
    ) -> Result<FillValueMetadata, IncompatibleFillValueError> {
        if fill_value.size() != self.size() {
            return Err(IncompatibleFillValueError(
                self.identifier().to_string(),
                fill_value.size(),
            ));
        }
        let bytes = fill_value.as_ne_bytes();
        let metadata = match self {
            Self::Bool => FillValueMetadata::Bool(bytes[0] != 0),
            Self::Int8 => {
                FillValueMetadata::Int(i64::from(i8::from_ne_bytes([bytes[0]])))
            }
            Self::Int16 => FillValueMetadata::Int(i64::from(i16::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            ))),
            Self::Int32 => FillValueMetadata::Int(i64::from(i32::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            ))),
            Self::Int64 => FillValueMetadata::Int(i64::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            )),
            Self::UInt8 => FillValueMetadata::UInt(u64::from(bytes[0])),
            Self::UInt16 => FillValueMetadata::UInt(u64::from(u16::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            ))),
            Self::UInt32 => FillValueMetadata::UInt(u64::from(u32::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            ))),
            Self::UInt64 => FillValueMetadata::UInt(u64::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            )),
            Self::Float32 => FillValueMetadata::from(f64::from(f32::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            ))),
            Self::Float64 => FillValueMetadata::from(f64::from_ne_bytes(
                bytes.try_into().expect("size validated"),
            )),
        };
        Ok(metadata)
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_metadata_round_trip() {
        for data_type in [
            DataType::Bool,
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float32,
            DataType::Float64,
        ] {
            assert_eq!(
                DataType::from_metadata(&data_type.metadata()).unwrap(),
                data_type
            );
        }
        assert!(DataType::from_metadata(&Metadata::new("complex64")).is_err());
    }

    #[test]
    fn data_type_sizes() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::UInt64.size(), 8);
    }

    #[test]
    fn fill_value_int() {
        let fill_value = DataType::Int8
            .fill_value_from_metadata(&FillValueMetadata::Int(-5))
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), (-5i8).to_ne_bytes().as_slice());
        assert!(DataType::Int8
            .fill_value_from_metadata(&FillValueMetadata::Int(200))
            .is_err());
        assert!(DataType::UInt8
            .fill_value_from_metadata(&FillValueMetadata::Int(-1))
            .is_err());
        // positive JSON integers deserialise as UInt and are accepted for signed types
        let fill_value = DataType::Int32
            .fill_value_from_metadata(&FillValueMetadata::UInt(7))
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), 7i32.to_ne_bytes().as_slice());
    }

    #[test]
    fn fill_value_float() {
        let fill_value = DataType::Float32
            .fill_value_from_metadata(&FillValueMetadata::Float(1.5))
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), 1.5f32.to_ne_bytes().as_slice());
        let fill_value = DataType::Float64
            .fill_value_from_metadata(&FillValueMetadata::from(f64::NAN))
            .unwrap();
        assert!(f64::from_ne_bytes(fill_value.as_ne_bytes().try_into().unwrap()).is_nan());
    }

    #[test]
    fn fill_value_metadata_round_trip() {
        let fill_value = FillValue::from(42u16);
        let metadata = DataType::UInt16.metadata_fill_value(&fill_value).unwrap();
        assert_eq!(metadata, FillValueMetadata::UInt(42));
        assert_eq!(
            DataType::UInt16.fill_value_from_metadata(&metadata).unwrap(),
            fill_value
        );
        assert!(DataType::UInt16
            .metadata_fill_value(&FillValue::from(0u8))
            .is_err());
    }

    #[test]
    fn fill_value_bool() {
        assert!(DataType::Bool
            .fill_value_from_metadata(&FillValueMetadata::UInt(1))
            .is_err());
        let fill_value = DataType::Bool
            .fill_value_from_metadata(&FillValueMetadata::Bool(true))
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), &[1]);
    }
}
