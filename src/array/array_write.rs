//! Array writing.
//!
//! Whole chunks are encoded and stored directly; a chunk whose content is entirely the fill
//! value is erased instead of stored. Partial chunk updates read-modify-write the chunk under
//! its store key mutex so concurrent writers of the same chunk cannot interleave. Writes
//! spanning multiple chunks are not atomic: an abandoned multi-chunk write may leave some chunks
//! updated and others not.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    array_subset::ArraySubset,
    storage::{meta_key, ReadableWritableStorageTraits, StorageError, WritableStorageTraits},
};

use super::{Array, ArrayError};

impl<TStorage: ?Sized + WritableStorageTraits> Array<TStorage> {
    /// Write the `zarr.json` metadata of the array.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the metadata cannot be stored.
    pub fn store_metadata(&self) -> Result<(), StorageError> {
        let key = meta_key(self.path());
        self.storage
            .set(&key, self.metadata().to_string_pretty().as_bytes())
    }

    /// Encode `chunk_bytes` and store the chunk at `chunk_indices`.
    ///
    /// A chunk that is entirely the fill value is erased rather than stored.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if `chunk_indices` are invalid, `chunk_bytes` does not match the
    /// chunk size, or encoding or storage fails.
    pub fn store_chunk(
        &self,
        chunk_indices: &[u64],
        chunk_bytes: Vec<u8>,
    ) -> Result<(), ArrayError> {
        self.chunk_subset(chunk_indices)?;
        let chunk_representation = self.chunk_array_representation();
        if chunk_bytes.len() as u64 != chunk_representation.size() {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_bytes.len(),
                chunk_representation.size(),
            ));
        }
        if self.fill_value.equals_all(&chunk_bytes) {
            self.erase_chunk(chunk_indices)?;
        } else {
            let encoded = self.codecs.encode(chunk_bytes, &chunk_representation)?;
            self.storage.set(&self.chunk_key(chunk_indices), &encoded)?;
        }
        Ok(())
    }

    /// Erase the chunk at `chunk_indices`.
    ///
    /// Succeeds if the chunk has never been stored.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if `chunk_indices` are invalid or storage fails.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<(), ArrayError> {
        self.chunk_subset(chunk_indices)?;
        self.storage.erase(&self.chunk_key(chunk_indices))?;
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Array<TStorage> {
    /// Overlay `chunk_subset_bytes` onto the `chunk_subset` region of the chunk at
    /// `chunk_indices` and store the result.
    ///
    /// `chunk_subset` is relative to the chunk origin. The chunk is read-modified-written under
    /// its store key mutex; the lock is released on all exit paths.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError`] if the subset is out of bounds of the chunk, the input size does
    /// not match, or storage or codec operations fail.
    pub fn store_chunk_subset(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
        chunk_subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        let chunk_shape = self.chunk_grid.chunk_shape().to_array_shape();
        if !chunk_subset.inbounds(&chunk_shape) {
            return Err(ArrayError::InvalidArraySubset(
                chunk_subset.clone(),
                chunk_shape,
            ));
        }
        let element_size = self.data_type.size();
        if chunk_subset_bytes.len() != chunk_subset.num_elements_usize() * element_size {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_subset_bytes.len(),
                chunk_subset.num_elements() * element_size as u64,
            ));
        }

        let mutex = self.storage.mutex(&self.chunk_key(chunk_indices))?;
        let _lock = mutex.lock();
        let mut chunk_bytes = self.retrieve_chunk(chunk_indices)?;
        chunk_subset.store_bytes(
            chunk_subset_bytes,
            &mut chunk_bytes,
            &chunk_shape,
            element_size,
        )?;
        self.store_chunk(chunk_indices, chunk_bytes)
    }

    /// Encode and store the `array_subset` region of the array from `subset_bytes`.
    ///
    /// Chunks entirely covered by the subset are stored without reading; partially covered
    /// chunks are read-modified-written under their store key mutex. Disjoint chunks are written
    /// in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidArraySubset`] if `array_subset` is out of bounds of the
    /// array (checked before any store mutation), [`ArrayError::InvalidBytesInputSize`] if
    /// `subset_bytes` does not match the subset, or an [`ArrayError`] on storage and codec
    /// failures.
    pub fn store_array_subset(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        if !array_subset.inbounds(self.shape()) {
            return Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ));
        }
        let element_size = self.data_type.size();
        if subset_bytes.len() != array_subset.num_elements_usize() * element_size {
            return Err(ArrayError::InvalidBytesInputSize(
                subset_bytes.len(),
                array_subset.num_elements() * element_size as u64,
            ));
        }
        if array_subset.is_empty() {
            return Ok(());
        }

        let chunks = self.chunks_in_array_subset(array_subset)?;
        chunks
            .indices()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .try_for_each(|chunk_indices| {
                let chunk_subset = self.chunk_subset(&chunk_indices)?;
                let overlap = array_subset.overlap(&chunk_subset)?;
                let overlap_bytes = overlap.relative_to(array_subset.start())?.extract_bytes(
                    subset_bytes,
                    array_subset.shape(),
                    element_size,
                )?;
                if overlap == chunk_subset {
                    self.store_chunk(&chunk_indices, overlap_bytes)
                } else {
                    self.store_chunk_subset(
                        &chunk_indices,
                        &overlap.relative_to(chunk_subset.start())?,
                        &overlap_bytes,
                    )
                }
            })
    }

    /// Encode and store the `array_subset` region of the array from its `elements`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::InvalidElementSize`] if the size of `T` does not match the array
    /// data type size, or any error of [`store_array_subset`](Array::store_array_subset).
    pub fn store_array_subset_elements<T: bytemuck::Pod>(
        &self,
        array_subset: &ArraySubset,
        elements: &[T],
    ) -> Result<(), ArrayError> {
        if core::mem::size_of::<T>() != self.data_type.size() {
            return Err(ArrayError::InvalidElementSize {
                got: core::mem::size_of::<T>(),
                expected: self.data_type.size(),
            });
        }
        self.store_array_subset(array_subset, bytemuck::cast_slice(elements))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        array::ArrayBuilder,
        storage::{store::MemoryStore, ReadableStorageTraits},
    };

    use super::*;

    fn test_array(storage: Arc<MemoryStore>) -> Array<MemoryStore> {
        ArrayBuilder::new(
            vec![10, 10],
            crate::array::DataType::UInt8,
            vec![5, 5],
            crate::array::FillValueMetadata::UInt(0),
        )
        .build(storage, "/image")
        .unwrap()
    }

    #[test]
    fn store_and_retrieve_chunk() {
        let storage = Arc::new(MemoryStore::new());
        let array = test_array(storage.clone());
        array.store_chunk(&[0, 1], vec![1; 25]).unwrap();
        assert_eq!(array.retrieve_chunk(&[0, 1]).unwrap(), vec![1; 25]);
        // unwritten chunks read as fill
        assert_eq!(array.retrieve_chunk(&[1, 1]).unwrap(), vec![0; 25]);
        assert!(array.retrieve_chunk_if_exists(&[1, 1]).unwrap().is_none());
        assert!(array.store_chunk(&[2, 0], vec![1; 25]).is_err());
        assert!(array.store_chunk(&[0, 0], vec![1; 10]).is_err());
    }

    #[test]
    fn fill_value_chunk_is_erased() {
        let storage = Arc::new(MemoryStore::new());
        let array = test_array(storage.clone());
        array.store_chunk(&[0, 0], vec![1; 25]).unwrap();
        assert!(storage
            .get(&array.chunk_key(&[0, 0]))
            .unwrap()
            .is_some());
        array.store_chunk(&[0, 0], vec![0; 25]).unwrap();
        assert!(storage
            .get(&array.chunk_key(&[0, 0]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn store_array_subset_spanning_chunks() {
        let storage = Arc::new(MemoryStore::new());
        let array = test_array(storage);
        let subset = ArraySubset::new_with_start_shape(vec![2, 2], vec![8, 8]).unwrap();
        array.store_array_subset(&subset, &[7; 64]).unwrap();

        let all = array
            .retrieve_array_subset(&array.subset_all())
            .unwrap();
        for row in 0..10u64 {
            for col in 0..10u64 {
                let expected = u8::from((2..10).contains(&row) && (2..10).contains(&col)) * 7;
                assert_eq!(all[usize::try_from(row * 10 + col).unwrap()], expected);
            }
        }
    }

    #[test]
    fn out_of_bounds_write_mutates_nothing() {
        let storage = Arc::new(MemoryStore::new());
        let array = test_array(storage.clone());
        let subset = ArraySubset::new_with_start_shape(vec![5, 5], vec![8, 8]).unwrap();
        assert!(matches!(
            array.store_array_subset(&subset, &[7; 64]),
            Err(ArrayError::InvalidArraySubset(_, _))
        ));
        use crate::storage::ListableStorageTraits;
        assert!(storage.list().unwrap().is_empty());
    }
}
