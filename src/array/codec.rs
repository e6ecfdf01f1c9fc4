//! Zarr codecs.
//!
//! A chunk is encoded for storage by a [`CodecChain`]: exactly one array to bytes codec turning
//! the in-memory element bytes into a byte sequence, followed by zero or more bytes to bytes
//! codecs (compressors, checksums) applied in order. Decoding applies the chain in reverse.
//!
//! Codecs are dispatched by name from metadata through [`Codec::from_metadata`]; the codecs of
//! this crate register themselves as [`CodecPlugin`]s with [inventory].
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#id18>.

mod bytes;
mod crc32c;
mod gzip;
mod sharding;
mod zstd;

pub use bytes::{BytesCodec, BytesCodecConfiguration, Endianness};
pub use crc32c::Crc32cCodec;
pub use gzip::{GzipCodec, GzipCodecConfiguration, GzipCompressionLevel};
pub use sharding::{ShardingCodec, ShardingCodecConfiguration};
pub use zstd::{ZstdCodec, ZstdCodecConfiguration};

use thiserror::Error;

use crate::{
    byte_range::InvalidByteRangeError,
    metadata::Metadata,
    plugin::{Plugin, PluginCreateError},
};

use super::{ArrayRepresentation, ChunkShape};

/// A codec plugin.
pub type CodecPlugin = Plugin<Codec>;
inventory::collect!(CodecPlugin);

/// A codec.
pub enum Codec {
    /// An array to bytes codec.
    ArrayToBytes(Box<dyn ArrayToBytesCodecTraits>),
    /// A bytes to bytes codec.
    BytesToBytes(Box<dyn BytesToBytesCodecTraits>),
}

impl Codec {
    /// Create a codec from metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PluginCreateError`] if the metadata is invalid or not associated with a
    /// registered codec plugin.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, PluginCreateError> {
        for plugin in inventory::iter::<CodecPlugin> {
            if plugin.match_name(metadata.name()) {
                return plugin.create(metadata);
            }
        }
        Err(PluginCreateError::Unsupported {
            name: metadata.name().to_string(),
            plugin_type: "codec".to_string(),
        })
    }
}

/// Codec traits.
pub trait CodecTraits: Send + Sync {
    /// Create the metadata of this codec.
    fn create_metadata(&self) -> Metadata;
}

/// Traits for array to bytes codecs.
pub trait ArrayToBytesCodecTraits: CodecTraits {
    /// Encode the element bytes of a chunk described by `decoded_representation`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if `decoded_value` is incompatible with `decoded_representation` or
    /// encoding fails.
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// Decode into the element bytes of a chunk described by `decoded_representation`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if `encoded_value` is corrupt or decoding fails.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError>;

    /// The inner chunk shape, if this codec subdivides its input into smaller chunks.
    fn inner_chunk_shape(&self) -> Option<ChunkShape> {
        None
    }
}

/// Traits for bytes to bytes codecs.
pub trait BytesToBytesCodecTraits: CodecTraits {
    /// Encode `decoded_value`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if encoding fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode `encoded_value`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if `encoded_value` is corrupt or decoding fails.
    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid byte range was requested.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// The decoded size of a chunk did not match the expected size.
    #[error("the decoded chunk size {0} does not match the expected size {1}")]
    UnexpectedChunkDecodedSize(usize, u64),
    /// A checksum was invalid.
    #[error("invalid checksum")]
    InvalidChecksum,
    /// Other error.
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// A sequence of codecs: one array to bytes codec followed by bytes to bytes codecs.
pub struct CodecChain {
    array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
    bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
}

impl core::fmt::Debug for CodecChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CodecChain")
            .field("array_to_bytes", &self.array_to_bytes.create_metadata())
            .field(
                "bytes_to_bytes",
                &self
                    .bytes_to_bytes
                    .iter()
                    .map(|codec| codec.create_metadata())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CodecChain {
    /// Create a new codec chain.
    #[must_use]
    pub fn new(
        array_to_bytes: Box<dyn ArrayToBytesCodecTraits>,
        bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>>,
    ) -> Self {
        Self {
            array_to_bytes,
            bytes_to_bytes,
        }
    }

    /// Create a codec chain from a list of codec metadata.
    ///
    /// The list must hold exactly one array to bytes codec, with any bytes to bytes codecs
    /// following it in application order.
    ///
    /// # Errors
    ///
    /// Returns [`PluginCreateError`] if any metadata is invalid or the codec composition is not
    /// supported.
    pub fn from_metadata(metadatas: &[Metadata]) -> Result<Self, PluginCreateError> {
        let mut array_to_bytes: Option<Box<dyn ArrayToBytesCodecTraits>> = None;
        let mut bytes_to_bytes: Vec<Box<dyn BytesToBytesCodecTraits>> = Vec::new();
        for metadata in metadatas {
            match Codec::from_metadata(metadata)? {
                Codec::ArrayToBytes(codec) => {
                    if array_to_bytes.is_some() {
                        return Err(PluginCreateError::Other(
                            "a codec chain must have exactly one array to bytes codec".to_string(),
                        ));
                    }
                    array_to_bytes = Some(codec);
                }
                Codec::BytesToBytes(codec) => {
                    if array_to_bytes.is_none() {
                        return Err(PluginCreateError::Other(format!(
                            "bytes to bytes codec {} precedes the array to bytes codec",
                            metadata.name()
                        )));
                    }
                    bytes_to_bytes.push(codec);
                }
            }
        }
        let array_to_bytes = array_to_bytes.ok_or_else(|| {
            PluginCreateError::Other(
                "a codec chain must have exactly one array to bytes codec".to_string(),
            )
        })?;
        Ok(Self {
            array_to_bytes,
            bytes_to_bytes,
        })
    }

    /// Create the metadata list of the codec chain.
    #[must_use]
    pub fn create_metadatas(&self) -> Vec<Metadata> {
        let mut metadatas = Vec::with_capacity(1 + self.bytes_to_bytes.len());
        metadatas.push(self.array_to_bytes.create_metadata());
        for codec in &self.bytes_to_bytes {
            metadatas.push(codec.create_metadata());
        }
        metadatas
    }

    /// Return the array to bytes codec of the chain.
    #[must_use]
    pub fn array_to_bytes_codec(&self) -> &dyn ArrayToBytesCodecTraits {
        self.array_to_bytes.as_ref()
    }

    /// Encode the element bytes of a chunk through the chain.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if any codec in the chain fails.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut value = self
            .array_to_bytes
            .encode(decoded_value, decoded_representation)?;
        for codec in &self.bytes_to_bytes {
            value = codec.encode(value)?;
        }
        Ok(value)
    }

    /// Decode encoded chunk bytes through the chain in reverse.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if any codec in the chain fails or the decoded size does not match
    /// `decoded_representation`.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut value = encoded_value;
        for codec in self.bytes_to_bytes.iter().rev() {
            value = codec.decode(value)?;
        }
        let value = self.array_to_bytes.decode(value, decoded_representation)?;
        if value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                value.len(),
                decoded_representation.size(),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{DataType, FillValue};

    use super::*;

    fn representation() -> ArrayRepresentation {
        ArrayRepresentation::new(vec![2, 2], DataType::UInt16, FillValue::from(0u16)).unwrap()
    }

    #[test]
    fn codec_chain_from_metadata() {
        let metadatas = [
            Metadata::try_from(r#"{"name":"bytes","configuration":{"endian":"little"}}"#).unwrap(),
            Metadata::try_from(r#"{"name":"gzip","configuration":{"level":5}}"#).unwrap(),
            Metadata::try_from(r#""crc32c""#).unwrap(),
        ];
        let chain = CodecChain::from_metadata(&metadatas).unwrap();
        assert_eq!(chain.create_metadatas().len(), 3);

        let decoded: Vec<u8> = vec![1, 0, 2, 0, 3, 0, 4, 0];
        let encoded = chain.encode(decoded.clone(), &representation()).unwrap();
        assert_eq!(chain.decode(encoded, &representation()).unwrap(), decoded);
    }

    #[test]
    fn codec_chain_requires_array_to_bytes() {
        let metadatas = [Metadata::try_from(r#""crc32c""#).unwrap()];
        assert!(CodecChain::from_metadata(&metadatas).is_err());

        let metadatas = [
            Metadata::try_from(r#""crc32c""#).unwrap(),
            Metadata::try_from(r#"{"name":"bytes","configuration":{"endian":"little"}}"#).unwrap(),
        ];
        assert!(CodecChain::from_metadata(&metadatas).is_err());
    }

    #[test]
    fn codec_chain_unknown_codec() {
        let metadatas = [Metadata::try_from(r#""turbojpeg""#).unwrap()];
        let err = CodecChain::from_metadata(&metadatas).unwrap_err();
        assert_eq!(err.to_string(), "codec turbojpeg is not supported");
    }
}
