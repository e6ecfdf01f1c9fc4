//! Chunk key encoding.
//!
//! Maps chunk grid cell coordinates to store key suffixes under an array prefix, e.g. chunk
//! `[0, 1]` to `c/0/1`.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#chunk-key-encoding>.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

const IDENTIFIER: &str = "default";

/// The separator between chunk coordinates in a chunk key.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Display, Default)]
pub enum ChunkKeySeparator {
    /// `/` separator.
    #[serde(rename = "/")]
    #[display("/")]
    #[default]
    Slash,
    /// `.` separator.
    #[serde(rename = ".")]
    #[display(".")]
    Dot,
}

/// `default` chunk key encoding configuration.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator.
    #[serde(default)]
    pub separator: ChunkKeySeparator,
}

/// The `default` chunk key encoding.
///
/// Encodes chunk indices as `c<separator><i0><separator><i1>...`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct DefaultChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl DefaultChunkKeyEncoding {
    /// Create a new `default` chunk key encoding.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a `default` chunk key encoding from metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PluginCreateError`] if the metadata name or configuration is not a supported
    /// chunk key encoding.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, PluginCreateError> {
        if metadata.name() != IDENTIFIER {
            return Err(PluginCreateError::Unsupported {
                name: metadata.name().to_string(),
                plugin_type: "chunk key encoding".to_string(),
            });
        }
        let configuration: DefaultChunkKeyEncodingConfiguration =
            if metadata.configuration_is_none_or_empty() {
                DefaultChunkKeyEncodingConfiguration::default()
            } else {
                metadata.to_configuration().map_err(|_| {
                    PluginMetadataInvalidError::new(
                        IDENTIFIER,
                        "chunk key encoding",
                        metadata.clone(),
                    )
                })?
            };
        Ok(Self::new(configuration.separator))
    }

    /// Create the metadata of this chunk key encoding.
    #[must_use]
    pub fn create_metadata(&self) -> Metadata {
        let configuration = DefaultChunkKeyEncodingConfiguration {
            separator: self.separator,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("chunk key encoding configuration is serializable")
    }

    /// Encode chunk indices into a chunk key suffix.
    #[must_use]
    pub fn encode(&self, chunk_indices: &[u64]) -> String {
        let mut key = "c".to_string();
        for chunk_index in chunk_indices {
            key.push_str(&format!("{}{chunk_index}", self.separator));
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_slash() {
        let encoding = DefaultChunkKeyEncoding::default();
        assert_eq!(encoding.encode(&[]), "c");
        assert_eq!(encoding.encode(&[1]), "c/1");
        assert_eq!(encoding.encode(&[1, 23, 45]), "c/1/23/45");
    }

    #[test]
    fn chunk_key_dot() {
        let encoding = DefaultChunkKeyEncoding::new(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23]), "c.1.23");
    }

    #[test]
    fn chunk_key_from_metadata() {
        let metadata =
            Metadata::try_from(r#"{"name":"default","configuration":{"separator":"/"}}"#).unwrap();
        let encoding = DefaultChunkKeyEncoding::from_metadata(&metadata).unwrap();
        assert_eq!(encoding.encode(&[0, 0]), "c/0/0");

        let metadata = Metadata::try_from(r#""default""#).unwrap();
        assert!(DefaultChunkKeyEncoding::from_metadata(&metadata).is_ok());

        let metadata = Metadata::try_from(r#""v2""#).unwrap();
        assert!(DefaultChunkKeyEncoding::from_metadata(&metadata).is_err());
    }
}
