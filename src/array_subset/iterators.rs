//! Iterators over the elements of an [`ArraySubset`].
//!
//! [`Indices`] iterates over the ND indices of every element in a subset in lexicographical
//! (row-major) order. [`ContiguousLinearisedIndices`] iterates over `(linearised index, length)`
//! runs of elements which are contiguous in the linearised representation of the containing
//! array; region extraction and overlay copy whole runs rather than single elements.

use super::{ravel_indices, ArraySubset, IncompatibleArraySubsetAndShapeError};

/// The ND indices of the elements of an array subset.
#[derive(Clone, Debug)]
pub struct Indices {
    subset: ArraySubset,
}

impl Indices {
    /// Create a new indices collection over `subset`.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        Self { subset }
    }

    /// Return the number of indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subset.num_elements_usize()
    }

    /// Returns true if the subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }

    /// Create an iterator over the indices.
    #[must_use]
    pub fn iter(&self) -> IndicesIterator {
        IndicesIterator::new(self.subset.clone())
    }
}

impl IntoIterator for Indices {
    type Item = Vec<u64>;
    type IntoIter = IndicesIterator;

    fn into_iter(self) -> Self::IntoIter {
        IndicesIterator::new(self.subset)
    }
}

impl IntoIterator for &Indices {
    type Item = Vec<u64>;
    type IntoIter = IndicesIterator;

    fn into_iter(self) -> Self::IntoIter {
        IndicesIterator::new(self.subset.clone())
    }
}

/// An iterator over the ND indices of an array subset, in lexicographical order.
#[derive(Clone, Debug)]
pub struct IndicesIterator {
    subset: ArraySubset,
    index: u64,
    num_elements: u64,
}

impl IndicesIterator {
    fn new(subset: ArraySubset) -> Self {
        let num_elements = subset.num_elements();
        Self {
            subset,
            index: 0,
            num_elements,
        }
    }
}

impl Iterator for IndicesIterator {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.num_elements {
            return None;
        }
        let mut indices = vec![0; self.subset.dimensionality()];
        let mut remaining = self.index;
        for (index, (start, size)) in indices
            .iter_mut()
            .zip(std::iter::zip(self.subset.start(), self.subset.shape()))
            .rev()
        {
            *index = start + remaining % size;
            remaining /= size;
        }
        self.index += 1;
        Some(indices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.num_elements - self.index).unwrap();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

/// The linearised indices of contiguous element runs of an array subset within a containing array.
#[derive(Clone, Debug)]
pub struct ContiguousLinearisedIndices {
    outer: ArraySubset,
    inner_start: Vec<u64>,
    array_shape: Vec<u64>,
    contiguous_elements: u64,
}

impl ContiguousLinearisedIndices {
    /// Create a new contiguous linearised indices collection over `subset` in an array of shape
    /// `array_shape`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleArraySubsetAndShapeError`] if `subset` is out of bounds of
    /// `array_shape`.
    pub fn new(
        subset: ArraySubset,
        array_shape: Vec<u64>,
    ) -> Result<Self, IncompatibleArraySubsetAndShapeError> {
        if !subset.inbounds(&array_shape) {
            return Err(IncompatibleArraySubsetAndShapeError::new(
                subset,
                array_shape,
            ));
        }

        // Grow the run from the innermost dimension outward. A dimension can be merged into the
        // run only if the dimension inside it spans its full extent in the containing array.
        let dimensionality = subset.dimensionality();
        let mut contiguous_elements: u64 = 1;
        let mut inner_dimensions: usize = 0;
        for dimension in (0..dimensionality).rev() {
            contiguous_elements *= subset.shape()[dimension];
            inner_dimensions += 1;
            let spans_array = subset.start()[dimension] == 0
                && subset.shape()[dimension] == array_shape[dimension];
            if !spans_array {
                break;
            }
        }

        let outer_dimensions = dimensionality - inner_dimensions;
        let outer = ArraySubset::new_with_start_shape(
            subset.start()[..outer_dimensions].to_vec(),
            subset.shape()[..outer_dimensions].to_vec(),
        )
        .expect("matching start/shape lengths");
        let inner_start = subset.start()[outer_dimensions..].to_vec();
        Ok(Self {
            outer,
            inner_start,
            array_shape,
            contiguous_elements,
        })
    }

    /// Return the number of elements in each contiguous run.
    #[must_use]
    pub const fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }

    /// Return the number of contiguous runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outer.num_elements_usize()
    }

    /// Returns true if there are no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for ContiguousLinearisedIndices {
    type Item = (u64, u64);
    type IntoIter = ContiguousLinearisedIndicesIterator;

    fn into_iter(self) -> Self::IntoIter {
        let outer_iterator = IndicesIterator::new(self.outer);
        ContiguousLinearisedIndicesIterator {
            outer_iterator,
            inner_start: self.inner_start,
            array_shape: self.array_shape,
            contiguous_elements: self.contiguous_elements,
        }
    }
}

/// An iterator yielding `(linearised start index, number of elements)` per contiguous run.
#[derive(Clone, Debug)]
pub struct ContiguousLinearisedIndicesIterator {
    outer_iterator: IndicesIterator,
    inner_start: Vec<u64>,
    array_shape: Vec<u64>,
    contiguous_elements: u64,
}

impl Iterator for ContiguousLinearisedIndicesIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let mut indices = self.outer_iterator.next()?;
        indices.extend_from_slice(&self.inner_start);
        let index = ravel_indices(&indices, &self.array_shape);
        Some((index, self.contiguous_elements))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.outer_iterator.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_iterator() {
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        let indices: Vec<_> = subset.indices().into_iter().collect();
        assert_eq!(
            indices,
            vec![vec![1, 1], vec![1, 2], vec![2, 1], vec![2, 2]]
        );
        assert_eq!(subset.indices().len(), 4);
    }

    #[test]
    fn indices_iterator_empty() {
        let subset = ArraySubset::new_with_shape(vec![0, 2]);
        assert_eq!(subset.indices().into_iter().count(), 0);
    }

    #[test]
    fn contiguous_rows() {
        // interior region: each row of the subset is a separate run
        let subset = ArraySubset::new_with_start_shape(vec![1, 1], vec![2, 2]).unwrap();
        let contiguous = subset.contiguous_linearised_indices(&[4, 4]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 2);
        let runs: Vec<_> = contiguous.into_iter().collect();
        assert_eq!(runs, vec![(5, 2), (9, 2)]);
    }

    #[test]
    fn contiguous_merged_rows() {
        // subset spans the full inner dimension, rows merge into larger runs
        let subset = ArraySubset::new_with_start_shape(vec![1, 0], vec![2, 4]).unwrap();
        let contiguous = subset.contiguous_linearised_indices(&[4, 4]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 8);
        let runs: Vec<_> = contiguous.into_iter().collect();
        assert_eq!(runs, vec![(4, 8)]);
    }

    #[test]
    fn contiguous_whole_array() {
        let subset = ArraySubset::new_with_shape(vec![4, 4]);
        let contiguous = subset.contiguous_linearised_indices(&[4, 4]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 16);
        let runs: Vec<_> = contiguous.into_iter().collect();
        assert_eq!(runs, vec![(0, 16)]);
    }

    #[test]
    fn contiguous_out_of_bounds() {
        let subset = ArraySubset::new_with_start_shape(vec![3, 3], vec![2, 2]).unwrap();
        assert!(subset.contiguous_linearised_indices(&[4, 4]).is_err());
    }

    #[test]
    fn contiguous_3d() {
        // trailing dimensions span fully, the whole tail merges into one run
        let subset = ArraySubset::new_with_start_shape(vec![1, 0, 0], vec![2, 2, 3]).unwrap();
        let contiguous = subset.contiguous_linearised_indices(&[3, 2, 3]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 12);
        let runs: Vec<_> = contiguous.into_iter().collect();
        assert_eq!(runs, vec![(6, 12)]);

        // a non-spanning middle dimension splits runs along the outer dimension
        let subset = ArraySubset::new_with_start_shape(vec![0, 0, 0], vec![2, 1, 3]).unwrap();
        let contiguous = subset.contiguous_linearised_indices(&[2, 2, 3]).unwrap();
        assert_eq!(contiguous.contiguous_elements(), 3);
        let runs: Vec<_> = contiguous.into_iter().collect();
        assert_eq!(runs, vec![(0, 3), (6, 3)]);
    }
}
