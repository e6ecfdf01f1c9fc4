//! Array subsets.
//!
//! An [`ArraySubset`] is a hyperrectangular region of an array, defined by a start (offset of the
//! first element) and a shape (extent per dimension). It underpins all region reads and writes:
//! mapping a requested region to the chunks it intersects, extracting the overlapping bytes of a
//! decoded chunk, and overlaying partial updates onto a chunk before it is re-encoded.
//!
//! Iteration over a subset is provided by the [`iterators`] module.

pub mod iterators;

use std::ops::Range;

use itertools::izip;
use thiserror::Error;

use iterators::{ContiguousLinearisedIndices, Indices};

/// An array subset.
///
/// The subset is defined in the coordinate space of some (implied) array; methods taking an
/// `array_shape` interpret the subset against that array.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ArraySubset {
    /// The start of the array subset.
    start: Vec<u64>,
    /// The shape of the array subset.
    shape: Vec<u64>,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new [`IncompatibleDimensionalityError`].
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An array subset and array shape are incompatible: the subset extends beyond the array bounds
/// or has a different dimensionality.
#[derive(Clone, Debug, Error)]
#[error("array subset {0} is incompatible with array of shape {1:?}")]
pub struct IncompatibleArraySubsetAndShapeError(ArraySubset, Vec<u64>);

impl IncompatibleArraySubsetAndShapeError {
    /// Create a new [`IncompatibleArraySubsetAndShapeError`].
    #[must_use]
    pub fn new(subset: ArraySubset, shape: Vec<u64>) -> Self {
        Self(subset, shape)
    }
}

/// Ravel ND `indices` into a linearised index for an array of `shape` (row-major).
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    debug_assert_eq!(indices.len(), shape.len());
    indices
        .iter()
        .zip(shape)
        .fold(0, |acc, (index, size)| acc * size + index)
}

impl ArraySubset {
    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: Vec<u64>) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset with `start` and `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the size of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: Vec<u64>,
        shape: Vec<u64>,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError(start.len(), shape.len()))
        }
    }

    /// Create a new array subset from a list of `ranges`.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the exclusive end of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> Vec<u64> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    ///
    /// Equal to the product of the components of its shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a [`usize`].
    ///
    /// # Panics
    ///
    /// Panics if [`Self::num_elements`] is greater than [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the array subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && std::iter::zip(self.end_exc(), array_shape)
                .all(|(end, array_size)| end <= *array_size)
    }

    /// Bound the array subset to the domain within `array_shape`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `array_shape` does not
    /// match the dimensionality of the array subset.
    pub fn bound(&self, array_shape: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if array_shape.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                array_shape.len(),
                self.dimensionality(),
            ));
        }
        let start: Vec<u64> = std::iter::zip(self.start(), array_shape)
            .map(|(&start, &bound)| start.min(bound))
            .collect();
        let shape = izip!(&start, self.end_exc(), array_shape)
            .map(|(&start, end, &bound)| end.min(bound).saturating_sub(start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return the overlapping subset between this array subset and `other`.
    ///
    /// The returned subset is in the same coordinate space as the inputs.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `other` does not match
    /// the dimensionality of this array subset.
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let start: Vec<u64> = std::iter::zip(self.start(), other.start())
            .map(|(a, b)| *a.max(b))
            .collect();
        let shape = izip!(&start, self.end_exc(), other.end_exc())
            .map(|(&start, end_a, end_b)| end_a.min(end_b).saturating_sub(start))
            .collect();
        Ok(Self { start, shape })
    }

    /// Return the subset relative to `start`.
    ///
    /// Creates an array subset starting at [`Self::start`] - `start`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` does not match the
    /// dimensionality of this array subset.
    pub fn relative_to(&self, start: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                start.len(),
                self.dimensionality(),
            ));
        }
        Ok(Self {
            start: std::iter::zip(self.start(), start)
                .map(|(a, b)| a.saturating_sub(*b))
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Return the ND indices of the elements of the array subset.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices::new(self.clone())
    }

    /// Return the linearised indices of contiguous element runs of this subset within an array of
    /// shape `array_shape`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the array subset is out of bounds of
    /// `array_shape`.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndices, IncompatibleArraySubsetAndShapeError> {
        ContiguousLinearisedIndices::new(self.clone(), array_shape.to_vec())
    }

    /// Return the bytes in this array subset from an array of shape `array_shape` with elements of
    /// size `element_size` represented as `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the array subset is out of bounds of
    /// `array_shape` or `bytes` does not match the expected length.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, IncompatibleArraySubsetAndShapeError> {
        let array_num_elements = array_shape.iter().product::<u64>();
        if bytes.len() as u64 != array_num_elements * element_size as u64 {
            return Err(IncompatibleArraySubsetAndShapeError(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let mut bytes_subset = Vec::with_capacity(self.num_elements_usize() * element_size);
        for (index, run_length) in self.contiguous_linearised_indices(array_shape)? {
            let byte_index = usize::try_from(index).unwrap() * element_size;
            let byte_length = usize::try_from(run_length).unwrap() * element_size;
            bytes_subset.extend_from_slice(&bytes[byte_index..byte_index + byte_length]);
        }
        Ok(bytes_subset)
    }

    /// Store `subset_bytes` into the region of this array subset within an array of shape
    /// `array_shape` with elements of size `element_size` represented as `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if the array subset is out of bounds of
    /// `array_shape`, or `bytes`/`subset_bytes` do not match their expected lengths.
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), IncompatibleArraySubsetAndShapeError> {
        let array_num_elements = array_shape.iter().product::<u64>();
        if bytes.len() as u64 != array_num_elements * element_size as u64
            || subset_bytes.len() != self.num_elements_usize() * element_size
        {
            return Err(IncompatibleArraySubsetAndShapeError(
                self.clone(),
                array_shape.to_vec(),
            ));
        }
        let mut offset = 0;
        for (index, run_length) in self.contiguous_linearised_indices(array_shape)? {
            let byte_index = usize::try_from(index).unwrap() * element_size;
            let byte_length = usize::try_from(run_length).unwrap() * element_size;
            bytes[byte_index..byte_index + byte_length]
                .copy_from_slice(&subset_bytes[offset..offset + byte_length]);
            offset += byte_length;
        }
        Ok(())
    }
}

impl std::fmt::Display for ArraySubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]",
            itertools::join(
                std::iter::zip(&self.start, self.end_exc())
                    .map(|(start, end)| format!("{start}..{end}")),
                ", "
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset_construction() {
        let subset = ArraySubset::new_with_shape(vec![2, 3]);
        assert_eq!(subset.start(), &[0, 0]);
        assert_eq!(subset.shape(), &[2, 3]);
        assert_eq!(subset.num_elements(), 6);
        assert!(!subset.is_empty());

        let subset = ArraySubset::new_with_start_shape(vec![1, 2], vec![2, 3]).unwrap();
        assert_eq!(subset.end_exc(), vec![3, 5]);
        assert_eq!(subset.to_string(), "[1..3, 2..5]");

        assert!(ArraySubset::new_with_start_shape(vec![1], vec![2, 3]).is_err());

        let subset = ArraySubset::new_with_ranges(&[1..3, 2..5]);
        assert_eq!(subset.start(), &[1, 2]);
        assert_eq!(subset.shape(), &[2, 3]);

        assert!(ArraySubset::new_with_shape(vec![0, 3]).is_empty());
    }

    #[test]
    fn array_subset_inbounds() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 2], vec![2, 3]).unwrap();
        assert!(subset.inbounds(&[3, 5]));
        assert!(subset.inbounds(&[4, 6]));
        assert!(!subset.inbounds(&[3, 4]));
        assert!(!subset.inbounds(&[3, 5, 1]));
    }

    #[test]
    fn array_subset_bound() {
        let subset = ArraySubset::new_with_start_shape(vec![2, 2], vec![4, 4]).unwrap();
        let bounded = subset.bound(&[5, 3]).unwrap();
        assert_eq!(bounded.start(), &[2, 2]);
        assert_eq!(bounded.shape(), &[3, 1]);
        assert!(subset.bound(&[5]).is_err());
    }

    #[test]
    fn array_subset_overlap() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![4, 4]).unwrap();
        let chunk = ArraySubset::new_with_start_shape(vec![0, 0], vec![2, 2]).unwrap();
        let overlap = subset.overlap(&chunk).unwrap();
        assert_eq!(overlap.start(), &[1, 1]);
        assert_eq!(overlap.shape(), &[1, 1]);

        let chunk = ArraySubset::new_with_start_shape(vec![2, 2], vec![2, 2]).unwrap();
        let overlap = subset.overlap(&chunk).unwrap();
        assert_eq!(overlap.start(), &[2, 2]);
        assert_eq!(overlap.shape(), &[2, 2]);

        let chunk = ArraySubset::new_with_start_shape(vec![8, 8], vec![2, 2]).unwrap();
        assert!(subset.overlap(&chunk).unwrap().is_empty());
    }

    #[test]
    fn array_subset_relative_to() {
        let subset = ArraySubset::new_with_start_shape(vec![2, 3], vec![2, 2]).unwrap();
        let relative = subset.relative_to(&[2, 2]).unwrap();
        assert_eq!(relative.start(), &[0, 1]);
        assert_eq!(relative.shape(), &[2, 2]);
        assert!(subset.relative_to(&[2]).is_err());
    }

    #[test]
    fn array_subset_extract_bytes() {
        // 3x4 array of u8 with values equal to their linearised index
        let bytes: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        let extracted = subset.extract_bytes(&bytes, &[3, 4], 1).unwrap();
        assert_eq!(extracted, vec![5, 6, 9, 10]);

        // full rows are a single contiguous run
        let subset = ArraySubset::new_with_start_shape(vec![1, 0], vec![2, 4]).unwrap();
        let extracted = subset.extract_bytes(&bytes, &[3, 4], 1).unwrap();
        assert_eq!(extracted, (4..12).collect::<Vec<u8>>());

        assert!(subset.extract_bytes(&bytes, &[3, 3], 1).is_err());
    }

    #[test]
    fn array_subset_store_bytes() {
        let mut bytes = vec![0u8; 12];
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        subset
            .store_bytes(&[1, 2, 3, 4], &mut bytes, &[3, 4], 1)
            .unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0]);

        assert!(subset
            .store_bytes(&[1, 2, 3], &mut bytes, &[3, 4], 1)
            .is_err());
    }

    #[test]
    fn ravel() {
        assert_eq!(ravel_indices(&[1, 2], &[3, 4]), 6);
        assert_eq!(ravel_indices(&[2, 3], &[3, 4]), 11);
        assert_eq!(ravel_indices(&[], &[]), 0);
    }
}
