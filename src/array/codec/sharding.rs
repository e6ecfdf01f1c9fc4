//! The `sharding_indexed` array to bytes codec.
//!
//! A shard is a stored unit holding a grid of smaller chunks, each encoded through an inner codec
//! chain, followed by a binary index locating them. The index holds a `(byte offset, byte length)`
//! pair of unsigned 64-bit integers per chunk, with both set to `u64::MAX` for chunks elided
//! because they are entirely the fill value. The index is itself encoded (little endian, with a
//! trailing CRC32C checksum by default) and placed at the end of the shard.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/codecs/sharding-indexed/v1.0.html>.

use serde::{Deserialize, Serialize};

use crate::{
    array::{ArrayRepresentation, ChunkShape, DataType, FillValue},
    array_subset::ArraySubset,
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::{
    crc32c::CHECKSUM_SIZE, ArrayToBytesCodecTraits, Codec, CodecChain, CodecError, CodecPlugin,
    CodecTraits,
};

const IDENTIFIER: &str = "sharding_indexed";

/// The sentinel index entry of a chunk with no stored representation.
const MISSING_CHUNK: u64 = u64::MAX;

inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_sharding, create_codec_sharding)
}

fn is_name_sharding(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_sharding(metadata: &Metadata) -> Result<Codec, PluginCreateError> {
    let configuration: ShardingCodecConfiguration = metadata
        .to_configuration()
        .map_err(|_| PluginMetadataInvalidError::new(IDENTIFIER, "codec", metadata.clone()))?;
    Ok(Codec::ArrayToBytes(Box::new(
        ShardingCodec::new_with_configuration(&configuration)?,
    )))
}

/// The location of the shard index within a shard.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShardingIndexLocation {
    /// The index precedes the chunks.
    Start,
    /// The index follows the chunks.
    #[default]
    End,
}

fn default_index_codecs() -> Vec<Metadata> {
    vec![
        crate::array::codec::BytesCodec::little().create_metadata(),
        Metadata::new("crc32c"),
    ]
}

/// `sharding_indexed` codec configuration.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ShardingCodecConfiguration {
    /// The shape of the inner chunks within a shard.
    pub chunk_shape: ChunkShape,
    /// The codecs applied to each inner chunk.
    pub codecs: Vec<Metadata>,
    /// The codecs applied to the shard index.
    #[serde(default = "default_index_codecs")]
    pub index_codecs: Vec<Metadata>,
    /// The location of the shard index.
    #[serde(default)]
    pub index_location: ShardingIndexLocation,
}

/// The `sharding_indexed` array to bytes codec.
pub struct ShardingCodec {
    /// The shape of the inner chunks within a shard.
    chunk_shape: ChunkShape,
    /// The codecs applied to each inner chunk.
    inner_codecs: CodecChain,
    /// The codecs applied to the shard index.
    index_codecs: CodecChain,
    /// The encoded size overhead of the index codecs beyond the raw index bytes.
    index_overhead: u64,
}

impl ShardingCodec {
    /// Create a new `sharding_indexed` codec.
    #[must_use]
    pub fn new(chunk_shape: ChunkShape, inner_codecs: CodecChain) -> Self {
        let index_codecs = CodecChain::from_metadata(&default_index_codecs())
            .expect("the default index codecs are valid");
        Self {
            chunk_shape,
            inner_codecs,
            index_codecs,
            index_overhead: CHECKSUM_SIZE as u64,
        }
    }

    /// Create a new `sharding_indexed` codec from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PluginCreateError`] if the inner or index codecs are invalid, or the
    /// configuration is otherwise unsupported.
    pub fn new_with_configuration(
        configuration: &ShardingCodecConfiguration,
    ) -> Result<Self, PluginCreateError> {
        if configuration.index_location == ShardingIndexLocation::Start {
            return Err(PluginCreateError::Other(
                "sharding_indexed index_location start is not supported".to_string(),
            ));
        }
        // The index must have a fixed encoded size to be addressable from the end of the shard,
        // which restricts index codecs to bytes and checksums.
        let mut index_overhead: u64 = 0;
        for metadata in &configuration.index_codecs {
            match metadata.name() {
                "bytes" => {}
                "crc32c" | "crc32" => index_overhead += CHECKSUM_SIZE as u64,
                name => {
                    return Err(PluginCreateError::Other(format!(
                        "index codec {name} is not supported for sharding_indexed"
                    )));
                }
            }
        }
        let inner_codecs = CodecChain::from_metadata(&configuration.codecs)?;
        let index_codecs = CodecChain::from_metadata(&configuration.index_codecs)?;
        Ok(Self {
            chunk_shape: configuration.chunk_shape.clone(),
            inner_codecs,
            index_codecs,
            index_overhead,
        })
    }

    /// The chunks per shard, or an error if the shard shape is not an exact multiple of the
    /// chunk shape.
    fn chunks_per_shard(
        &self,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u64>, CodecError> {
        let shard_shape = decoded_representation.shape();
        if shard_shape.len() != self.chunk_shape.len() {
            return Err(CodecError::Other(format!(
                "sharding chunk shape {:?} does not match shard dimensionality {}",
                self.chunk_shape.to_array_shape(),
                shard_shape.len()
            )));
        }
        std::iter::zip(shard_shape, self.chunk_shape.as_slice())
            .map(|(&shard, &chunk)| {
                let chunk = chunk.get();
                if shard % chunk == 0 {
                    Ok(shard / chunk)
                } else {
                    Err(CodecError::Other(format!(
                        "shard shape {shard_shape:?} is not a multiple of chunk shape {:?}",
                        self.chunk_shape.to_array_shape()
                    )))
                }
            })
            .collect()
    }

    fn index_representation(num_chunks: u64) -> ArrayRepresentation {
        ArrayRepresentation::new(
            vec![num_chunks, 2],
            DataType::UInt64,
            FillValue::from(MISSING_CHUNK),
        )
        .expect("the shard index representation is valid")
    }

    fn chunk_representation(
        &self,
        decoded_representation: &ArrayRepresentation,
    ) -> ArrayRepresentation {
        ArrayRepresentation::new(
            self.chunk_shape.to_array_shape(),
            decoded_representation.data_type(),
            decoded_representation.fill_value().clone(),
        )
        .expect("the fill value matches the data type of the shard")
    }

    fn encoded_index_size(&self, num_chunks: u64) -> u64 {
        num_chunks * 2 * DataType::UInt64.size() as u64 + self.index_overhead
    }
}

impl CodecTraits for ShardingCodec {
    fn create_metadata(&self) -> Metadata {
        let configuration = ShardingCodecConfiguration {
            chunk_shape: self.chunk_shape.clone(),
            codecs: self.inner_codecs.create_metadatas(),
            index_codecs: self.index_codecs.create_metadatas(),
            index_location: ShardingIndexLocation::End,
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("sharding codec configuration is serializable")
    }
}

impl ArrayToBytesCodecTraits for ShardingCodec {
    fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        if decoded_value.len() as u64 != decoded_representation.size() {
            return Err(CodecError::UnexpectedChunkDecodedSize(
                decoded_value.len(),
                decoded_representation.size(),
            ));
        }
        let chunks_per_shard = self.chunks_per_shard(decoded_representation)?;
        let num_chunks = chunks_per_shard.iter().product::<u64>();
        let chunk_representation = self.chunk_representation(decoded_representation);
        let chunk_shape = self.chunk_shape.to_array_shape();
        let element_size = decoded_representation.element_size();
        let fill_value = decoded_representation.fill_value();

        let mut index = vec![MISSING_CHUNK; usize::try_from(num_chunks * 2).unwrap()];
        let mut shard = Vec::<u8>::new();
        for (chunk, chunk_indices) in ArraySubset::new_with_shape(chunks_per_shard)
            .indices()
            .into_iter()
            .enumerate()
        {
            let chunk_subset = ArraySubset::new_with_start_shape(
                std::iter::zip(&chunk_indices, &chunk_shape)
                    .map(|(index, size)| index * size)
                    .collect(),
                chunk_shape.clone(),
            )
            .expect("chunk indices and shape have the shard dimensionality");
            let chunk_bytes = chunk_subset
                .extract_bytes(
                    &decoded_value,
                    decoded_representation.shape(),
                    element_size,
                )
                .map_err(|err| CodecError::Other(err.to_string()))?;
            if fill_value.equals_all(&chunk_bytes) {
                continue;
            }
            let chunk_encoded = self.inner_codecs.encode(chunk_bytes, &chunk_representation)?;
            index[chunk * 2] = shard.len() as u64;
            index[chunk * 2 + 1] = chunk_encoded.len() as u64;
            shard.extend_from_slice(&chunk_encoded);
        }

        let index_bytes: Vec<u8> = bytemuck::cast_slice(&index).to_vec();
        let index_encoded = self
            .index_codecs
            .encode(index_bytes, &Self::index_representation(num_chunks))?;
        shard.extend_from_slice(&index_encoded);
        Ok(shard)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ArrayRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let chunks_per_shard = self.chunks_per_shard(decoded_representation)?;
        let num_chunks = chunks_per_shard.iter().product::<u64>();
        let index_size = usize::try_from(self.encoded_index_size(num_chunks)).unwrap();
        if encoded_value.len() < index_size {
            return Err(CodecError::Other(format!(
                "shard of {} bytes is too small to hold its index of {index_size} bytes",
                encoded_value.len()
            )));
        }
        let chunks_end = encoded_value.len() - index_size;
        let index_decoded = self.index_codecs.decode(
            encoded_value[chunks_end..].to_vec(),
            &Self::index_representation(num_chunks),
        )?;
        let index: Vec<u64> = bytemuck::allocation::pod_collect_to_vec(&index_decoded);

        let chunk_representation = self.chunk_representation(decoded_representation);
        let chunk_shape = self.chunk_shape.to_array_shape();
        let element_size = decoded_representation.element_size();
        let mut shard = decoded_representation
            .fill_value()
            .as_ne_bytes()
            .repeat(usize::try_from(decoded_representation.num_elements()).unwrap());

        for (chunk, chunk_indices) in ArraySubset::new_with_shape(chunks_per_shard)
            .indices()
            .into_iter()
            .enumerate()
        {
            let (offset, size) = (index[chunk * 2], index[chunk * 2 + 1]);
            if offset == MISSING_CHUNK && size == MISSING_CHUNK {
                continue;
            }
            let end = offset.checked_add(size).filter(|end| *end <= chunks_end as u64);
            let Some(end) = end else {
                return Err(CodecError::Other(format!(
                    "shard index entry {chunk} ({offset} + {size}) is out of bounds"
                )));
            };
            let chunk_encoded =
                encoded_value[usize::try_from(offset).unwrap()..usize::try_from(end).unwrap()]
                    .to_vec();
            let chunk_bytes = self
                .inner_codecs
                .decode(chunk_encoded, &chunk_representation)?;
            let chunk_subset = ArraySubset::new_with_start_shape(
                std::iter::zip(&chunk_indices, &chunk_shape)
                    .map(|(index, size)| index * size)
                    .collect(),
                chunk_shape.clone(),
            )
            .expect("chunk indices and shape have the shard dimensionality");
            chunk_subset
                .store_bytes(
                    &chunk_bytes,
                    &mut shard,
                    decoded_representation.shape(),
                    element_size,
                )
                .map_err(|err| CodecError::Other(err.to_string()))?;
        }
        Ok(shard)
    }

    fn inner_chunk_shape(&self) -> Option<ChunkShape> {
        Some(self.chunk_shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::array::codec::{BytesCodec, GzipCodec};

    use super::*;

    fn shard_representation() -> ArrayRepresentation {
        ArrayRepresentation::new(vec![4, 4], DataType::UInt16, FillValue::from(0u16)).unwrap()
    }

    fn sharding_codec() -> ShardingCodec {
        ShardingCodec::new(
            ChunkShape::try_from(vec![2, 2]).unwrap(),
            CodecChain::new(
                Box::new(BytesCodec::little()),
                vec![Box::new(GzipCodec::new(5).unwrap())],
            ),
        )
    }

    #[test]
    fn sharding_round_trip() {
        let codec = sharding_codec();
        let decoded: Vec<u8> = (0..16u16)
            .flat_map(|element| element.to_ne_bytes())
            .collect();
        let encoded = codec.encode(decoded.clone(), &shard_representation()).unwrap();
        assert_eq!(
            codec.decode(encoded, &shard_representation()).unwrap(),
            decoded
        );
    }

    #[test]
    fn sharding_elides_fill_value_chunks() {
        let codec = sharding_codec();
        // only the first 2x2 chunk holds data
        let mut elements = vec![0u16; 16];
        elements[0] = 1;
        elements[1] = 2;
        elements[4] = 3;
        elements[5] = 4;
        let decoded: Vec<u8> = elements
            .iter()
            .flat_map(|element| element.to_ne_bytes())
            .collect();
        let encoded = codec.encode(decoded.clone(), &shard_representation()).unwrap();

        let all_fill: Vec<u8> = vec![0; 32];
        let encoded_fill = codec
            .encode(all_fill.clone(), &shard_representation())
            .unwrap();
        // an all-fill shard is just the index
        assert_eq!(encoded_fill.len(), 4 * 16 + CHECKSUM_SIZE);
        assert!(encoded.len() > encoded_fill.len());

        assert_eq!(
            codec.decode(encoded, &shard_representation()).unwrap(),
            decoded
        );
        assert_eq!(
            codec.decode(encoded_fill, &shard_representation()).unwrap(),
            all_fill
        );
    }

    #[test]
    fn sharding_rejects_incompatible_shard_shape() {
        let codec = sharding_codec();
        let representation =
            ArrayRepresentation::new(vec![5, 4], DataType::UInt16, FillValue::from(0u16)).unwrap();
        assert!(codec.encode(vec![0; 40], &representation).is_err());
    }

    #[test]
    fn sharding_detects_index_corruption() {
        let codec = sharding_codec();
        let decoded: Vec<u8> = (0..16u16)
            .flat_map(|element| element.to_ne_bytes())
            .collect();
        let mut encoded = codec.encode(decoded, &shard_representation()).unwrap();
        let index_offset = encoded.len() - 4 * 16 - CHECKSUM_SIZE;
        encoded[index_offset] = !encoded[index_offset];
        assert!(codec.decode(encoded, &shard_representation()).is_err());
    }

    #[test]
    fn sharding_from_metadata() {
        let metadata = Metadata::try_from(
            r#"{
                "name": "sharding_indexed",
                "configuration": {
                    "chunk_shape": [2, 2],
                    "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
                    "index_codecs": [
                        {"name": "bytes", "configuration": {"endian": "little"}},
                        {"name": "crc32c"}
                    ],
                    "index_location": "end"
                }
            }"#,
        )
        .unwrap();
        let codec = Codec::from_metadata(&metadata).unwrap();
        let Codec::ArrayToBytes(codec) = codec else {
            panic!("sharding_indexed is an array to bytes codec")
        };
        assert_eq!(
            codec.inner_chunk_shape().unwrap().to_array_shape(),
            vec![2, 2]
        );
    }
}
