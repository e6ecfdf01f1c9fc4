use std::num::NonZeroU64;

use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};

/// The shape of a chunk. All dimensions must be non-zero.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Deref, From)]
#[serde(transparent)]
pub struct ChunkShape(Vec<NonZeroU64>);

impl ChunkShape {
    /// Convert a chunk shape to a [`Vec<u64>`].
    #[must_use]
    pub fn to_array_shape(&self) -> Vec<u64> {
        self.0.iter().map(|dimension| dimension.get()).collect()
    }

    /// The number of elements in a chunk of this shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.0.iter().map(|dimension| dimension.get()).product()
    }

    /// The number of elements in a chunk of this shape as a [`usize`].
    ///
    /// # Panics
    ///
    /// Panics if [`Self::num_elements`] is greater than [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }
}

impl TryFrom<&[u64]> for ChunkShape {
    type Error = std::num::TryFromIntError;

    fn try_from(value: &[u64]) -> Result<Self, Self::Error> {
        value
            .iter()
            .map(|&dimension| NonZeroU64::try_from(dimension))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl TryFrom<Vec<u64>> for ChunkShape {
    type Error = std::num::TryFromIntError;

    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        value.as_slice().try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_shape() {
        let chunk_shape = ChunkShape::try_from(vec![2, 3, 4]).unwrap();
        assert_eq!(chunk_shape.to_array_shape(), vec![2, 3, 4]);
        assert_eq!(chunk_shape.num_elements(), 24);
        assert!(ChunkShape::try_from(vec![2, 0, 4]).is_err());
    }

    #[test]
    fn chunk_shape_json() {
        let chunk_shape: ChunkShape = serde_json::from_str("[5, 5]").unwrap();
        assert_eq!(chunk_shape.to_array_shape(), vec![5, 5]);
        assert_eq!(serde_json::to_string(&chunk_shape).unwrap(), "[5,5]");
        assert!(serde_json::from_str::<ChunkShape>("[5, 0]").is_err());
    }
}
