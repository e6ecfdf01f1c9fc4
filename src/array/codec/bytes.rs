//! The `bytes` array to bytes codec.
//!
//! Encodes array elements in a specified endianness, defaulting to little endian.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/bytes/v1.0.html>.

use serde::{Deserialize, Serialize};

use crate::{
    array::ArrayRepresentation,
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{ArrayToBytesCodecTraits, Codec, CodecError, CodecPlugin, CodecTraits};

const IDENTIFIER: &str = "bytes";

inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_bytes, create_codec_bytes)
}

fn is_name_bytes(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_bytes(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: BytesCodecConfiguration = if metadata.configuration_is_none_or_empty() {
        BytesCodecConfiguration { endian: None }
    } else {
        metadata
            .to_configuration()
            .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata.clone()))?
    };
    Ok(Codec::ArrayToBytes(Box::new(
        BytesCodec::new_with_configuration(&configuration),
    )))
}

/// The endianness of multi-byte elements.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

impl Endianness {
    /// Returns true if the endianness matches the native endianness of the target.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIANNESS
    }
}

/// The native endianness of the target.
#[cfg(target_endian = "big")]
const NATIVE_ENDIANNESS: Endianness = Endianness::Big;
#[cfg(target_endian = "little")]
const NATIVE_ENDIANNESS: Endianness = Endianness::Little;

/// `bytes` codec configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct BytesCodecConfiguration {
    /// The endianness of the encoded elements. May be omitted for single-byte data types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endian: Option<Endianness>,
}

/// The `bytes` array to bytes codec.
#[derive(Copy, Clone, Debug)]
pub struct BytesCodec {
    endian: Option<Endianness>,
}

impl Default for BytesCodec {
    fn default() -> Self {
        Self::little()
    }
}

impl BytesCodec {
    /// Create a new `bytes` codec.
    #[must_use]
    pub const fn new(endian: Option<Endianness>) -> Self {
        Self { endian }
    }

    /// Create a new `bytes` codec for little endian data.
    #[must_use]
    pub const fn little() -> Self {
        Self::new(Some(Endianness::Little))
    }

    /// Create a new `bytes` codec from a configuration.
    #[must_use]
    pub const fn new_with_configuration(configuration: &BytesCodecConfiguration) -> Self {
        Self::new(configuration.endian)
    }

    fn do_encode_or_decode(
        &self,
        mut value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                value.len(),
                decoded_representation.size(),
            ));
        }
        let element_size = decoded_representation.element_size();
        if element_size > 1 {
            match self.endian {
                None => {
                    return Err(CodecError::Other(format!(
                        "the bytes codec requires an endianness for data type {}",
                        decoded_representation.data_type()
                    )));
                }
                Some(endian) if !endian.is_native() => {
                    reverse_endianness(&mut value, element_size);
                }
                Some(_) => {}
            }
        }
        Ok(value)
    }
}

fn reverse_endianness(bytes: &mut [u8], element_size: usize) {
    for element in bytes.chunks_exact_mut(element_size) {
        element.reverse();
    }
}

impl CodecTraits for BytesCodec {
    fn create_metadata(&self) -> Metadata {
        let configuration = BytesCodecConfiguration {
            endian: self.endian,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("bytes codec configuration is serializable")
    }
}

impl ArrayToBytesCodecTraits for BytesCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(decoded_value, decoded_representation)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        self.do_encode_or_decode(encoded_value, decoded_representation)
    }
}
