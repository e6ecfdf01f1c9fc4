//! The `crc32c` bytes to bytes codec.
//!
//! Appends a CRC32C checksum of the input bytes, stored as a little endian 32-bit unsigned
//! integer. The checksum is validated and stripped on decode.
//!
//! Also matched by the legacy name `crc32`, written by some producers.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/crc32c/v1.0.html>.

use crate::{
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{BytesToBytesCodecTraits, Codec, CodecError, CodecPlugin, CodecTraits};

const IDENTIFIER: &str = "crc32c";

/// The checksum size in bytes.
pub const CHECKSUM_SIZE: usize = core::mem::size_of::<u32>();

inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_crc32c, create_codec_crc32c)
}

fn is_name_crc32c(name: &str) -> bool {
    name.eq(IDENTIFIER) || name.eq("crc32")
}

fn create_codec_crc32c(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    if metadata.configuration_is_none_or_empty() {
        Ok(Codec::BytesToBytes(Box::new(Crc32cCodec::new())))
    } else {
        Err(PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata.clone()).into())
    }
}

/// The `crc32c` bytes to bytes codec.
#[derive(Copy, Clone, Debug, Default)]
pub struct Crc32cCodec;

impl Crc32cCodec {
    /// Create a new `crc32c` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CodecTraits for Crc32cCodec {
    fn create_metadata(&self) -> Metadata {
        Metadata::new(IDENTIFIER)
    }
}

impl BytesToBytesCodecTraits for Crc32cCodec {
    fn encode(&self, mut decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value);
        decoded_value.extend_from_slice(&checksum.to_le_bytes());
        Ok(decoded_value)
    }

    fn decode(&self, mut encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if encoded_value.len() < CHECKSUM_SIZE {
            return Err(CodecError::InvalidChecksum);
        }
        let split = encoded_value.len() - CHECKSUM_SIZE;
        let checksum = u32::from_le_bytes(
            encoded_value[split..]
                .try_into()
                .expect("the slice is CHECKSUM_SIZE bytes"),
        );
        if checksum != crc32c::crc32c(&encoded_value[..split]) {
            return Err(CodecError::InvalidChecksum);
        }
        encoded_value.truncate(split);
        Ok(encoded_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32c_round_trip() {
        let codec = Crc32cCodec::new();
        let decoded: Vec<u8> = (0..100).collect();
        let encoded = codec.encode(decoded.clone()).unwrap();
        assert_eq!(encoded.len(), decoded.len() + CHECKSUM_SIZE);
        assert_eq!(codec.decode(encoded).unwrap(), decoded);
    }

    #[test]
    fn crc32c_detects_corruption() {
        let codec = Crc32cCodec::new();
        let mut encoded = codec.encode((0..100).collect()).unwrap();
        encoded[3] = !encoded[3];
        assert!(matches!(
            codec.decode(encoded),
            Err(CodecError::InvalidChecksum)
        ));
        assert!(matches!(
            codec.decode(vec![0; 2]),
            Err(CodecError::InvalidChecksum)
        ));
    }

    #[test]
    fn crc32c_names() {
        assert!(Codec::from_metadata(&Metadata::new("crc32c")).is_ok());
        assert!(Codec::from_metadata(&Metadata::new("crc32")).is_ok());
    }

    #[test]
    fn crc32c_rejects_configuration() {
        let metadata =
            Metadata::try_from(r#"{"name":"crc32c","configuration":{"level":1}}"#).unwrap();
        assert!(Codec::from_metadata(&metadata).is_err());
    }
}
