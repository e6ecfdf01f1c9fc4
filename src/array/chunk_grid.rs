//! The regular chunk grid.
//!
//! A regular chunk grid divides an array into uniformly shaped rectangular chunks, with chunks at
//! the end of each dimension possibly overhanging the array bounds.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#chunk-grids>.

use serde::{Deserialize, Serialize};

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    metadata::Metadata,
    plugin::{PluginCreateError, PluginMetadataInvalidError},
};

use super::ChunkShape;

const IDENTIFIER: &str = "regular";

/// `regular` chunk grid configuration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegularChunkGridConfiguration {
    /// The shape of a chunk.
    pub chunk_shape: ChunkShape,
}

/// A `regular` chunk grid.
#[derive(Clone, Debug)]
pub struct RegularChunkGrid {
    chunk_shape: ChunkShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid with `chunk_shape`.
    #[must_use]
    pub const fn new(chunk_shape: ChunkShape) -> Self {
        Self { chunk_shape }
    }

    /// Create a regular chunk grid from metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PluginCreateError`] if the metadata is not a valid regular chunk grid.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, PluginCreateError> {
        if metadata.name() != IDENTIFIER {
            return Err(PluginCreateError::Unsupported {
                name: metadata.name().to_string(),
                plugin_type: "chunk grid".to_string(),
            });
        }
        let configuration: RegularChunkGridConfiguration =
            metadata.to_configuration().map_err(|_| {
                PluginMetadataInvalidError::new(IDENTIFIER, "chunk grid", metadata.clone())
            })?;
        Ok(Self::new(configuration.chunk_shape))
    }

    /// Create the metadata of this chunk grid.
    #[must_use]
    pub fn create_metadata(&self) -> Metadata {
        let configuration = RegularChunkGridConfiguration {
            chunk_shape: self.chunk_shape.clone(),
        };
        Metadata::new_with_serializable_configuration(IDENTIFIER, &configuration)
            .expect("chunk grid configuration is serializable")
    }

    /// The shape of a chunk.
    #[must_use]
    pub const fn chunk_shape(&self) -> &ChunkShape {
        &self.chunk_shape
    }

    /// The dimensionality of the chunk grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// The shape of the chunk grid for an array of `array_shape` (the number of chunks per
    /// dimension, rounding up where the array shape is not an exact multiple).
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if `array_shape` does not match the grid
    /// dimensionality.
    pub fn grid_shape(&self, array_shape: &[u64]) -> Result<Vec<u64>, IncompatibleDimensionalityError> {
        if array_shape.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ));
        }
        Ok(std::iter::zip(array_shape, self.chunk_shape.as_slice())
            .map(|(&array, &chunk)| array.div_ceil(chunk.get()))
            .collect())
    }

    /// The origin of the chunk at `chunk_indices`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if `chunk_indices` does not match the grid
    /// dimensionality.
    pub fn chunk_origin(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Vec<u64>, IncompatibleDimensionalityError> {
        if chunk_indices.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                chunk_indices.len(),
                self.dimensionality(),
            ));
        }
        Ok(std::iter::zip(chunk_indices, self.chunk_shape.as_slice())
            .map(|(&index, &chunk)| index * chunk.get())
            .collect())
    }

    /// The array subset covered by the chunk at `chunk_indices`, unbounded by any array shape.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if `chunk_indices` does not match the grid
    /// dimensionality.
    pub fn chunk_subset(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        let origin = self.chunk_origin(chunk_indices)?;
        Ok(
            ArraySubset::new_with_start_shape(origin, self.chunk_shape.to_array_shape())
                .expect("origin and chunk shape share the grid dimensionality"),
        )
    }

    /// The chunk grid cells intersected by `array_subset`, as a subset of chunk indices.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if `array_subset` does not match the grid
    /// dimensionality.
    pub fn chunks_in_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if array_subset.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                array_subset.dimensionality(),
                self.dimensionality(),
            ));
        }
        if array_subset.is_empty() {
            return Ok(ArraySubset::new_with_shape(vec![0; self.dimensionality()]));
        }
        let start: Vec<u64> = std::iter::zip(array_subset.start(), self.chunk_shape.as_slice())
            .map(|(&index, &chunk)| index / chunk.get())
            .collect();
        let shape = itertools::izip!(&start, array_subset.end_exc(), self.chunk_shape.as_slice())
            .map(|(&first, end, &chunk)| (end - 1) / chunk.get() - first + 1)
            .collect();
        Ok(ArraySubset::new_with_start_shape(start, shape)
            .expect("start and shape share the grid dimensionality"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RegularChunkGrid {
        RegularChunkGrid::new(ChunkShape::try_from(vec![5, 5]).unwrap())
    }

    #[test]
    fn grid_shape() {
        assert_eq!(grid().grid_shape(&[10, 10]).unwrap(), vec![2, 2]);
        // partial edge chunks round up
        assert_eq!(grid().grid_shape(&[11, 9]).unwrap(), vec![3, 2]);
        assert!(grid().grid_shape(&[10]).is_err());
    }

    #[test]
    fn chunk_subset() {
        let subset = grid().chunk_subset(&[1, 2]).unwrap();
        assert_eq!(subset.start(), &[5, 10]);
        assert_eq!(subset.shape(), &[5, 5]);
        assert!(grid().chunk_subset(&[1]).is_err());
    }

    #[test]
    fn chunks_in_array_subset() {
        // a region straddling all four chunks of a 10x10 array
        let region = ArraySubset::new_with_start_shape(vec![2, 2], vec![6, 6]).unwrap();
        let chunks = grid().chunks_in_array_subset(&region).unwrap();
        assert_eq!(chunks.start(), &[0, 0]);
        assert_eq!(chunks.shape(), &[2, 2]);

        // a region within a single chunk
        let region = ArraySubset::new_with_start_shape(vec![6, 6], vec![2, 2]).unwrap();
        let chunks = grid().chunks_in_array_subset(&region).unwrap();
        assert_eq!(chunks.start(), &[1, 1]);
        assert_eq!(chunks.shape(), &[1, 1]);

        // an empty region intersects no chunks
        let region = ArraySubset::new_with_shape(vec![0, 0]);
        assert!(grid()
            .chunks_in_array_subset(&region)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn metadata_round_trip() {
        let metadata = grid().create_metadata();
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"name":"regular","configuration":{"chunk_shape":[5,5]}}"#
        );
        let grid = RegularChunkGrid::from_metadata(&metadata).unwrap();
        assert_eq!(grid.chunk_shape().to_array_shape(), vec![5, 5]);

        let metadata = Metadata::try_from(r#"{"name":"rectangular","configuration":{}}"#).unwrap();
        assert!(RegularChunkGrid::from_metadata(&metadata).is_err());
    }
}
