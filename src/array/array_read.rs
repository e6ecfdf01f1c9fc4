//! Array reading.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{array_subset::ArraySubset, storage::ReadableStorageTraits};

use super::{Array, ArrayError};

impl<TStorage: ?Sized + ReadableStorageTraits> Array<TStorage> {
    /// Read and decode the chunk at `chunk_indices`, or [`None`] if it has never been stored.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if `chunk_indices` are invalid, the storage fails for a reason
    /// other than a missing key, or decoding fails.
    pub fn retrieve_chunk_if_exists(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u8>>, ArrayError> {
        self.chunk_subset(chunk_indices)?;
        let key = self.chunk_key(chunk_indices);
        let Some(encoded) = self.storage.get(&key)? else {
            return Ok(None);
        };
        let decoded = self
            .codecs
            .decode(encoded, &self.chunk_array_representation())?;
        Ok(Some(decoded))
    }

    /// Read and decode the chunk at `chunk_indices`.
    ///
    /// A chunk that has never been stored decodes to the fill value.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if `chunk_indices` are invalid, the storage fails for a reason
    /// other than a missing key, or decoding fails.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ArrayError> {
        Ok(self
            .retrieve_chunk_if_exists(chunk_indices)?
            .unwrap_or_else(|| self.fill_value_chunk_bytes()))
    }

    /// Read and decode the `array_subset` region of the array into its bytes.
    ///
    /// The output is dense and row-major with exactly the requested shape. Chunks intersecting
    /// the subset are fetched and decoded in parallel; the merge into the output buffer completes
    /// before this method returns.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidArraySubset`] if `array_subset` is out of bounds of the
    /// array, or an [`ArrayError`] on storage and codec failures.
    pub fn retrieve_array_subset(&self, array_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        if !array_subset.inbounds(self.shape()) {
            return Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ));
        }
        let element_size = self.data_type.size();
        if array_subset.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.chunks_in_array_subset(array_subset)?;

        // fast path: a single chunk read covering exactly the requested subset
        if chunks.num_elements() == 1 {
            let chunk_indices = chunks.start();
            let chunk_subset = self.chunk_subset(chunk_indices)?;
            if &chunk_subset == array_subset {
                return self.retrieve_chunk(chunk_indices);
            }
        }

        let chunk_bytes = chunks
            .indices()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|chunk_indices| {
                let chunk_subset = self.chunk_subset(&chunk_indices)?;
                let overlap = array_subset.overlap(&chunk_subset)?;
                let decoded = self.retrieve_chunk(&chunk_indices)?;
                let overlap_bytes = overlap.relative_to(chunk_subset.start())?.extract_bytes(
                    &decoded,
                    chunk_subset.shape(),
                    element_size,
                )?;
                Ok::<_, ArrayError>((overlap, overlap_bytes))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut output = vec![0u8; array_subset.num_elements_usize() * element_size];
        for (overlap, overlap_bytes) in chunk_bytes {
            overlap.relative_to(array_subset.start())?.store_bytes(
                &overlap_bytes,
                &mut output,
                array_subset.shape(),
                element_size,
            )?;
        }
        Ok(output)
    }

    /// Read and decode the `array_subset` region of the array into a [`Vec`] of its elements.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidElementSize`] if the size of `T` does not match the array
    /// data type size, or any error of [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn retrieve_array_subset_elements<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        if core::mem::size_of::<T>() != self.data_type.size() {
            return Err(ArrayError::InvalidElementSize {
                got: core::mem::size_of::<T>(),
                expected: self.data_type.size(),
            });
        }
        let bytes = self.retrieve_array_subset(array_subset)?;
        Ok(bytemuck::allocation::pod_collect_to_vec(&bytes))
    }
}
