//! Chunk and shard layout policy.
//!
//! A [`ChunkLayout`] decides, for a given array shape and requested chunk shape, how elements are
//! grouped into chunks and whether chunks are aggregated into shards (larger stored units holding
//! many chunks behind an index). Shard shapes are derived from a [`ShardStrategy`].
//!
//! A derived shard shape is only honoured when it is compatible with the chunk shape and array
//! shape: every shard dimension must be at least the chunk dimension, an exact multiple of it,
//! and no larger than the array dimension. An incompatible combination logs a warning and falls
//! back to unsharded storage rather than failing the caller.

use thiserror::Error;

/// A strategy for deriving the shard shape of an array.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ShardStrategy {
    /// A single shard holds the entire array.
    Single,
    /// Each shard holds exactly one chunk.
    Chunk,
    /// Shards are derived by doubling chunk dimensions.
    ///
    /// The two fastest-varying spatial dimensions are doubled unconditionally; any other
    /// dimension is doubled only where the array extends beyond a single chunk. All dimensions
    /// are capped at the array shape.
    Superchunk,
    /// An explicit shard shape.
    Custom(Vec<u64>),
}

/// The chunk and shard shapes of an array.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ChunkLayout {
    /// The chunk shape.
    pub chunk_shape: Vec<u64>,
    /// The shard shape, if sharding is active.
    pub shard_shape: Option<Vec<u64>>,
}

/// A chunk layout derivation error.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The chunk shape dimensionality does not match the array shape.
    #[error("chunk shape {chunk_shape:?} does not match array dimensionality {array_dimensionality}")]
    IncompatibleDimensionality {
        /// The requested chunk shape.
        chunk_shape: Vec<u64>,
        /// The array dimensionality.
        array_dimensionality: usize,
    },
    /// A chunk dimension is zero.
    #[error("chunk shape {0:?} has a zero dimension")]
    ZeroChunkDimension(Vec<u64>),
    /// A custom shard shape has the wrong dimensionality.
    #[error("shard shape {shard_shape:?} does not match array dimensionality {array_dimensionality}")]
    IncompatibleShardDimensionality {
        /// The requested shard shape.
        shard_shape: Vec<u64>,
        /// The array dimensionality.
        array_dimensionality: usize,
    },
}

/// Check whether `shard_shape` can hold chunks of `chunk_shape` within an array of `array_shape`.
///
/// Compatible means, per dimension: the shard is at least as large as the chunk, an exact
/// multiple of it, and no larger than the array.
#[must_use]
pub fn chunk_and_shard_compatible(
    chunk_shape: &[u64],
    shard_shape: &[u64],
    array_shape: &[u64],
) -> bool {
    chunk_shape.len() == shard_shape.len()
        && chunk_shape.len() == array_shape.len()
        && itertools::izip!(chunk_shape, shard_shape, array_shape).all(
            |(&chunk, &shard, &array)| {
                shard >= chunk && shard % chunk == 0 && shard <= array
            },
        )
}

impl ChunkLayout {
    /// Derive the chunk layout of an array.
    ///
    /// The requested chunk shape is clamped to the array shape. If `strategy` is [`None`] the
    /// layout is unsharded. Otherwise a shard shape is derived from the strategy; if it is not
    /// compatible with the chunk and array shapes, a warning is logged and the layout degrades
    /// to unsharded.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if `chunk_shape` has a dimensionality mismatch or zero dimension,
    /// or a [`ShardStrategy::Custom`] shard shape has a dimensionality mismatch.
    pub fn derive(
        array_shape: &[u64],
        chunk_shape: &[u64],
        strategy: Option<&ShardStrategy>,
    ) -> Result<Self, LayoutError> {
        if chunk_shape.len() != array_shape.len() {
            return Err(LayoutError::IncompatibleDimensionality {
                chunk_shape: chunk_shape.to_vec(),
                array_dimensionality: array_shape.len(),
            });
        }
        if chunk_shape.contains(&0) {
            return Err(LayoutError::ZeroChunkDimension(chunk_shape.to_vec()));
        }

        let chunk_shape: Vec<u64> = std::iter::zip(chunk_shape, array_shape)
            .map(|(&chunk, &array)| chunk.min(array).max(1))
            .collect();

        let Some(strategy) = strategy else {
            return Ok(Self {
                chunk_shape,
                shard_shape: None,
            });
        };

        let shard_shape = match strategy {
            ShardStrategy::Single => array_shape.to_vec(),
            ShardStrategy::Chunk => chunk_shape.clone(),
            ShardStrategy::Superchunk => superchunk_shape(array_shape, &chunk_shape),
            ShardStrategy::Custom(shard_shape) => {
                if shard_shape.len() != array_shape.len() {
                    return Err(LayoutError::IncompatibleShardDimensionality {
                        shard_shape: shard_shape.clone(),
                        array_dimensionality: array_shape.len(),
                    });
                }
                shard_shape.clone()
            }
        };

        if chunk_and_shard_compatible(&chunk_shape, &shard_shape, array_shape) {
            Ok(Self {
                chunk_shape,
                shard_shape: Some(shard_shape),
            })
        } else {
            log::warn!(
                "shard shape {shard_shape:?} is incompatible with chunk shape {chunk_shape:?} \
                 and array shape {array_shape:?}, falling back to unsharded storage"
            );
            Ok(Self {
                chunk_shape,
                shard_shape: None,
            })
        }
    }

    /// The shape of the stored unit: the shard shape when sharding is active, the chunk shape
    /// otherwise.
    #[must_use]
    pub fn stored_unit_shape(&self) -> &[u64] {
        self.shard_shape.as_deref().unwrap_or(&self.chunk_shape)
    }
}

fn superchunk_shape(array_shape: &[u64], chunk_shape: &[u64]) -> Vec<u64> {
    std::iter::zip(chunk_shape, array_shape)
        .enumerate()
        .map(|(axis, (&chunk, &array))| {
            if axis < 2 || array > chunk {
                (chunk * 2).min(array)
            } else {
                chunk
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility() {
        assert!(chunk_and_shard_compatible(&[5, 5], &[10, 10], &[10, 10]));
        assert!(chunk_and_shard_compatible(&[5, 5], &[5, 5], &[10, 10]));
        // not a multiple
        assert!(!chunk_and_shard_compatible(&[7, 7], &[10, 10], &[10, 10]));
        // larger than the array
        assert!(!chunk_and_shard_compatible(&[5, 5], &[15, 15], &[10, 10]));
        // smaller than the chunk
        assert!(!chunk_and_shard_compatible(&[5, 5], &[4, 5], &[10, 10]));
        // dimensionality mismatch
        assert!(!chunk_and_shard_compatible(&[5, 5], &[5], &[10, 10]));
    }

    #[test]
    fn unsharded() {
        let layout = ChunkLayout::derive(&[10, 10], &[5, 5], None).unwrap();
        assert_eq!(layout.chunk_shape, vec![5, 5]);
        assert_eq!(layout.shard_shape, None);
        assert_eq!(layout.stored_unit_shape(), &[5, 5]);
    }

    #[test]
    fn chunk_clamped_to_array() {
        let layout = ChunkLayout::derive(&[10, 3], &[16, 16], None).unwrap();
        assert_eq!(layout.chunk_shape, vec![10, 3]);
    }

    #[test]
    fn single_strategy() {
        let layout = ChunkLayout::derive(&[10, 10], &[5, 5], Some(&ShardStrategy::Single)).unwrap();
        assert_eq!(layout.shard_shape, Some(vec![10, 10]));
        assert_eq!(layout.stored_unit_shape(), &[10, 10]);
    }

    #[test]
    fn chunk_strategy() {
        let layout = ChunkLayout::derive(&[10, 10], &[5, 5], Some(&ShardStrategy::Chunk)).unwrap();
        assert_eq!(layout.shard_shape, Some(vec![5, 5]));
    }

    #[test]
    fn superchunk_strategy() {
        let layout = ChunkLayout::derive(
            &[100, 100, 3, 4, 5],
            &[20, 20, 3, 4, 5],
            Some(&ShardStrategy::Superchunk),
        )
        .unwrap();
        assert_eq!(layout.shard_shape, Some(vec![40, 40, 3, 4, 5]));
    }

    #[test]
    fn superchunk_capped_at_array() {
        let layout = ChunkLayout::derive(
            &[30, 30],
            &[15, 15],
            Some(&ShardStrategy::Superchunk),
        )
        .unwrap();
        // doubling is capped at the array shape
        assert_eq!(layout.shard_shape, Some(vec![30, 30]));
    }

    #[test]
    fn incompatible_falls_back_to_unsharded() {
        // single shard of [10, 10] is not a multiple of [7, 7]
        let layout = ChunkLayout::derive(&[10, 10], &[7, 7], Some(&ShardStrategy::Single)).unwrap();
        assert_eq!(layout.chunk_shape, vec![7, 7]);
        assert_eq!(layout.shard_shape, None);
    }

    #[test]
    fn custom_strategy() {
        let layout = ChunkLayout::derive(
            &[20, 20],
            &[5, 5],
            Some(&ShardStrategy::Custom(vec![10, 20])),
        )
        .unwrap();
        assert_eq!(layout.shard_shape, Some(vec![10, 20]));

        assert!(ChunkLayout::derive(
            &[20, 20],
            &[5, 5],
            Some(&ShardStrategy::Custom(vec![10])),
        )
        .is_err());
    }

    #[test]
    fn invalid_chunk_shapes() {
        assert!(ChunkLayout::derive(&[10, 10], &[5], None).is_err());
        assert!(ChunkLayout::derive(&[10, 10], &[5, 0], None).is_err());
    }
}
