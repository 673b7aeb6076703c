//! Flat-array N-dimensional dense matrix.
//!
//! Values are stored row-major: the last dimension varies fastest. The
//! matrix is also a [`Vector`] over its flattened index space, so it takes
//! part in dot products with any other representation.

use super::{Vector, VectorResult, extended};
use crate::error::VectorError;
use crate::simd::{self, DenseKernel};

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixN {
    dims: Vec<usize>,
    values: Vec<f64>,
    has_infinite: bool,
}

impl MatrixN {
    /// A zero matrix with the given dimensions.
    pub fn new(dims: &[usize]) -> Self {
        let len = dims.iter().product();
        Self {
            dims: dims.to_vec(),
            values: vec![0.0; len],
            has_infinite: false,
        }
    }

    /// Wrap flattened row-major `values`.
    pub fn from_values(dims: &[usize], values: Vec<f64>) -> VectorResult<Self> {
        let expected: usize = dims.iter().product();
        if values.len() != expected {
            return Err(VectorError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }
        let has_infinite = extended::any_infinite(&values);
        Ok(Self {
            dims: dims.to_vec(),
            values,
            has_infinite,
        })
    }

    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// Flattened values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Flat index of a coordinate tuple.
    pub fn single_index(&self, coords: &[usize]) -> VectorResult<usize> {
        if coords.len() != self.dims.len() {
            return Err(VectorError::DimensionMismatch {
                expected: self.dims.len(),
                actual: coords.len(),
            });
        }
        let mut flat = 0;
        for (&coord, &dim) in coords.iter().zip(&self.dims) {
            if coord >= dim {
                return Err(VectorError::IndexOutOfRange {
                    index: coord,
                    size: dim,
                });
            }
            flat = flat * dim + coord;
        }
        Ok(flat)
    }

    /// Coordinate tuple of a flat index.
    pub fn multi_index(&self, flat: usize) -> VectorResult<Vec<usize>> {
        let size = self.values.len();
        if flat >= size {
            return Err(VectorError::IndexOutOfRange { index: flat, size });
        }
        let mut coords = vec![0; self.dims.len()];
        let mut rest = flat;
        for (slot, &dim) in coords.iter_mut().zip(&self.dims).rev() {
            *slot = rest % dim;
            rest /= dim;
        }
        Ok(coords)
    }

    pub fn value_at(&self, coords: &[usize]) -> VectorResult<f64> {
        let flat = self.single_index(coords)?;
        Ok(self.values[flat])
    }

    pub fn set_value_at(&mut self, coords: &[usize], value: f64) -> VectorResult<()> {
        let flat = self.single_index(coords)?;
        self.values[flat] = value;
        self.has_infinite |= value.is_infinite();
        Ok(())
    }

    /// `self += other * factor`; both matrices must have equal dimensions.
    pub fn plus_equals(&mut self, other: &MatrixN, factor: f64) -> VectorResult<()> {
        self.plus_equals_with(simd::kernel(), other, factor)
    }

    /// [`MatrixN::plus_equals`] running on `kernel`.
    pub fn plus_equals_with(
        &mut self,
        kernel: &dyn DenseKernel,
        other: &MatrixN,
        factor: f64,
    ) -> VectorResult<()> {
        if self.dims != other.dims {
            return Err(VectorError::DimensionMismatch {
                expected: self.values.len(),
                actual: other.values.len(),
            });
        }
        if !self.has_infinite && !other.has_infinite && factor.is_finite() {
            kernel.axpy(&mut self.values, &other.values, factor);
        } else {
            for (acc, &src) in self.values.iter_mut().zip(&other.values) {
                *acc = extended::add_scaled(*acc, src, factor);
            }
        }
        self.has_infinite = extended::any_infinite(&self.values);
        Ok(())
    }
}

impl Vector for MatrixN {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn num_locations(&self) -> usize {
        self.values.len()
    }

    fn index_at_location(&self, location: usize) -> usize {
        location
    }

    fn value_at_location(&self, location: usize) -> f64 {
        self.values[location]
    }

    fn location(&self, index: usize) -> Option<usize> {
        (index < self.values.len()).then_some(index)
    }

    fn has_infinite(&self) -> bool {
        self.has_infinite
    }

    fn dense_values(&self) -> Option<&[f64]> {
        Some(&self.values)
    }
}
