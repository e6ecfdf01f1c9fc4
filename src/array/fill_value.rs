//! Array fill values.
//!
//! A [`FillValue`] is the native-endian byte representation of the element value used for any
//! portion of an array that has not been written. Its JSON form in array metadata is
//! [`FillValueMetadata`].
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#fill-value>.

use derive_more::From;
use serde::{Deserialize, Serialize};

/// The byte representation of an array fill value.
#[derive(Clone, Eq, PartialEq, Debug, From)]
pub struct FillValue(Vec<u8>);

impl FillValue {
    /// Create a new fill value from its byte representation.
    #[must_use]
    pub fn new(fill_value: Vec<u8>) -> Self {
        Self(fill_value)
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Check if the bytes of an array are entirely composed of the fill value.
    ///
    /// Returns false for a zero-size fill value or if `bytes` is not a multiple of the fill value
    /// size.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        !self.0.is_empty()
            && bytes.len() % self.0.len() == 0
            && bytes
                .chunks_exact(self.0.len())
                .all(|element| element == self.0.as_slice())
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        Self(vec![u8::from(value)])
    }
}

macro_rules! impl_fill_value_from_ne_bytes {
    ($($type:ty),*) => {
        $(
            impl From<$type> for FillValue {
                fn from(value: $type) -> Self {
                    Self(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from_ne_bytes!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// A non-finite float fill value serialised as a JSON string.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum FillValueFloatStringNonFinite {
    /// Positive infinity.
    #[serde(rename = "Infinity")]
    PosInfinity,
    /// Negative infinity.
    #[serde(rename = "-Infinity")]
    NegInfinity,
    /// NaN (a JSON number cannot represent NaN).
    #[serde(rename = "NaN")]
    NaN,
}

impl std::fmt::Display for FillValueFloatStringNonFinite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PosInfinity => write!(f, "Infinity"),
            Self::NegInfinity => write!(f, "-Infinity"),
            Self::NaN => write!(f, "NaN"),
        }
    }
}

impl From<FillValueFloatStringNonFinite> for f64 {
    fn from(value: FillValueFloatStringNonFinite) -> Self {
        match value {
            FillValueFloatStringNonFinite::PosInfinity => Self::INFINITY,
            FillValueFloatStringNonFinite::NegInfinity => Self::NEG_INFINITY,
            FillValueFloatStringNonFinite::NaN => Self::NAN,
        }
    }
}

/// The JSON representation of a fill value in array metadata.
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#fill-value>.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValueMetadata {
    /// A boolean value.
    Bool(bool),
    /// An unsigned integer (any non-negative JSON integer).
    UInt(u64),
    /// A signed integer (any negative JSON integer).
    Int(i64),
    /// A finite float.
    Float(f64),
    /// A non-finite float, serialised as a string.
    NonFinite(FillValueFloatStringNonFinite),
}

impl std::fmt::Display for FillValueMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::NonFinite(value) => write!(f, "{value}"),
        }
    }
}

impl FillValueMetadata {
    /// Interpret the metadata as a signed integer, if possible.
    #[must_use]
    pub fn try_as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Interpret the metadata as an unsigned integer, if possible.
    #[must_use]
    pub fn try_as_uint(&self) -> Option<u64> {
        match self {
            Self::UInt(value) => Some(*value),
            Self::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Interpret the metadata as a float, if possible.
    ///
    /// Integer values are converted; non-finite strings map to their float values.
    #[must_use]
    pub fn try_as_float(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss)]
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            Self::UInt(value) => Some(*value as f64),
            Self::NonFinite(value) => Some(f64::from(*value)),
            Self::Bool(_) => None,
        }
    }
}

impl From<f64> for FillValueMetadata {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Self::NonFinite(FillValueFloatStringNonFinite::NaN)
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                Self::NonFinite(FillValueFloatStringNonFinite::PosInfinity)
            } else {
                Self::NonFinite(FillValueFloatStringNonFinite::NegInfinity)
            }
        } else {
            Self::Float(value)
        }
    }
}
