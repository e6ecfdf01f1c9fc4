use super::{DataType, FillValue, IncompatibleFillValueError};

/// The shape, data type, and fill value of an array or chunk being encoded or decoded.
#[derive(Clone, Debug)]
pub struct ArrayRepresentation {
    /// The shape of the array.
    shape: Vec<u64>,
    /// The data type of the array.
    data_type: DataType,
    /// The fill value of the array.
    fill_value: FillValue,
}

impl ArrayRepresentation {
    /// Create a new [`ArrayRepresentation`].
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleFillValueError`] if the fill value byte length does not match the
    /// data type size.
    pub fn new(
        shape: Vec<u64>,
        data_type: DataType,
        fill_value: FillValue,
    ) -> Result<Self, IncompatibleFillValueError> {
        if fill_value.size() == data_type.size() {
            Ok(Self {
                shape,
                data_type,
                fill_value,
            })
        } else {
            Err(IncompatibleFillValueError::new(
                data_type.identifier().to_string(),
                fill_value.size(),
            ))
        }
    }

    /// Return the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Return the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the element size in bytes.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.data_type.size()
    }

    /// Return the total size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.num_elements() * self.element_size() as u64
    }

    /// Return the total size in bytes as a [`usize`].
    ///
    /// # Panics
    ///
    /// Panics if the size is greater than [`usize::MAX`].
    #[must_use]
    pub fn size_usize(&self) -> usize {
        usize::try_from(self.size()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_representation() {
        let representation =
            ArrayRepresentation::new(vec![2, 3], DataType::UInt16, FillValue::from(0u16)).unwrap();
        assert_eq!(representation.num_elements(), 6);
        assert_eq!(representation.element_size(), 2);
        assert_eq!(representation.size(), 12);

        assert!(
            ArrayRepresentation::new(vec![2, 3], DataType::UInt16, FillValue::from(0u8)).is_err()
        );
    }
}
