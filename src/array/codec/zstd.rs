//! The `zstd` bytes to bytes codec.
//!
//! Applies Zstandard compression.

use serde::{Deserialize, Serialize};

use crate::{
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{BytesToBytesCodecTraits, Codec, CodecError, CodecPlugin, CodecTraits};

const IDENTIFIER: &str = "zstd";

inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_zstd, create_codec_zstd)
}

fn is_name_zstd(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_zstd(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: ZstdCodecConfiguration = if metadata.configuration_is_none_or_empty() {
        ZstdCodecConfiguration::default()
    } else {
        metadata
            .to_configuration()
            .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata.clone()))?
    };
    Ok(Codec::BytesToBytes(Box::new(
        ZstdCodec::new_with_configuration(&configuration),
    )))
}

/// `zstd` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ZstdCodecConfiguration {
    /// The compression level.
    #[serde(default)]
    pub level: i32,
    /// Whether the zstd frame carries a content checksum.
    #[serde(default)]
    pub checksum: bool,
}

/// The `zstd` bytes to bytes codec.
#[derive(Copy, Clone, Debug)]
pub struct ZstdCodec {
    compression_level: i32,
    checksum: bool,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(compression_level: i32, checksum: bool) -> Self {
        Self {
            compression_level,
            checksum,
        }
    }

    /// Create a new `zstd` codec from a configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &ZstdCodecConfiguration) -> Self {
        Self {
            compression_level: configuration.level,
            checksum: configuration.checksum,
        }
    }
}

impl CodecTraits for ZstdCodec {
    fn create_metadata(&self) -> Metadata {
        let configuration = ZstdCodecConfiguration {
            level: self.compression_level,
            checksum: self.checksum,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("zstd codec configuration is serializable")
    }
}

impl BytesToBytesCodecTraits for ZstdCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder =
            zstd::Encoder::new(Vec::<u8>::new(), self.compression_level)?;
        encoder.include_checksum(self.checksum)?;
        let mut writer = encoder;
        std::io::copy(&mut decoded_value.as_slice(), &mut writer)?;
        Ok(writer.finish()?)
    }

    fn decode(&self, encoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(encoded_value.as_slice()).map_err(CodecError::from)
    }
}
