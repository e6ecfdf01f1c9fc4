//! The `gzip` bytes to bytes codec.
//!
//! Applies gzip compression.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/gzip/v1.0.html>.

use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{BytesToBytesCodecTraits, Codec, CodecError, CodecPlugin, CodecTraits};

const IDENTIFIER: &str = "gzip";

inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_gzip, create_codec_gzip)
}

fn is_name_gzip(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_gzip(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: GzipCodecConfiguration = if metadata.configuration_is_none_or_empty() {
        GzipCodecConfiguration::default()
    } else {
        metadata
            .to_configuration()
            .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata.clone()))?
    };
    Ok(Codec::BytesToBytes(Box::new(
        GzipCodec::new_with_configuration(&configuration),
    )))
}

/// An integer from 0 to 9 controlling the compression level.
///
/// A level of 1 is the fastest compression method and produces the least compression, while 9 is
/// slowest and produces the most compression. Compression is turned off when the level is 0.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(try_from = "u32")]
pub struct GzipCompressionLevel(u32);

/// An invalid gzip compression level.
#[derive(Copy, Clone, Debug, Error)]
#[error("invalid gzip compression level {0}, must be 0 to 9")]
pub struct GzipCompressionLevelError(u32);

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if level <= 9 {
            Ok(Self(level))
        } else {
            Err(GzipCompressionLevelError(level))
        }
    }
}

impl Default for GzipCompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

impl GzipCompressionLevel {
    /// Return the level as a [`u32`].
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// `gzip` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct GzipCodecConfiguration {
    /// The compression level.
    #[serde(default)]
    pub level: GzipCompressionLevel,
}

/// The `gzip` bytes to bytes codec.
#[derive(Copy, Clone, Debug)]
pub struct GzipCodec {
    compression_level: GzipCompressionLevel,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    ///
    /// Returns [`GzipCompressionLevelError`] if `compression_level` is not valid.
    pub fn new(compression_level: u32) -> Result<Self, GzipCompressionLevelError> {
        Ok(Self {
            compression_level: compression_level.try_into()?,
        })
    }

    /// Create a new `gzip` codec from a configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &GzipCodecConfiguration) -> Self {
        Self {
            compression_level: configuration.level,
        }
    }
}

impl CodecTraits for GzipCodec {
    fn create_metadata(&self) -> Metadata {
        let configuration = GzipCodecConfiguration {
            level: self.compression_level,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("gzip codec configuration is serializable")
    }
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = flate2::bufread::GzEncoder::new(
            decoded_value.as_slice(),
            flate2::Compression::new(self.compression_level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut decoder = flate2::bufread::GzDecoder::new(encoded_value.as_slice());
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let codec = GzipCodec::new(5).unwrap();
        let decoded: Vec<u8> = (0..64u8).cycle().take(1024).collect();
        let encoded = codec.encode(decoded.clone()).unwrap();
        assert!(encoded.len() < decoded.len());
        assert_eq!(codec.decode(encoded).unwrap(), decoded);
    }

    #[test]
    fn gzip_invalid_level() {
        assert!(GzipCodec::new(10).is_err());
        assert!(serde_json::from_str::<GzipCodecConfiguration>(r#"{"level":10}"#).is_err());
    }

    #[test]
    fn gzip_from_metadata() {
        let metadata = Metadata::try_from(r#"{"name":"gzip","configuration":{"level":9}}"#).unwrap();
        let codec = Codec::from_metadata(&metadata).unwrap();
        let Codec::BytesToBytes(codec) = codec else {
            panic!("gzip is a bytes to bytes codec")
        };
        assert_eq!(
            serde_json::to_string(&codec.create_metadata()).unwrap(),
            r#"{"name":"gzip","configuration":{"level":9}}"#
        );
    }
}
