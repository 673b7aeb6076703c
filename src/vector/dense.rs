//! Dense vectors: every position of the domain is materialized.

use super::{Entries, Vector, VectorResult, extended};
use crate::error::VectorError;
use crate::simd::{self, DenseKernel};

/// A vector storing a value for every index `0..size`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    values: Vec<f64>,
    has_infinite: bool,
}

impl DenseVector {
    /// A vector of `size` zeros.
    pub fn zeros(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
            has_infinite: false,
        }
    }

    /// A vector of `size` copies of `value`.
    pub fn filled(size: usize, value: f64) -> Self {
        Self {
            values: vec![value; size],
            has_infinite: value.is_infinite() && size > 0,
        }
    }

    /// Take ownership of `values`.
    pub fn from_vec(values: Vec<f64>) -> Self {
        let has_infinite = extended::any_infinite(&values);
        Self {
            values,
            has_infinite,
        }
    }

    /// The raw values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Give back the raw values.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no positions.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check_index(&self, index: usize) -> VectorResult<()> {
        if index >= self.values.len() {
            return Err(VectorError::IndexOutOfRange {
                index,
                size: self.values.len(),
            });
        }
        Ok(())
    }

    fn store(&mut self, index: usize, value: f64) {
        self.has_infinite |= value.is_infinite();
        self.values[index] = value;
    }

    fn rescan(&mut self) {
        self.has_infinite = extended::any_infinite(&self.values);
    }

    /// Set the value at `index`.
    pub fn set_value(&mut self, index: usize, value: f64) -> VectorResult<()> {
        self.check_index(index)?;
        self.store(index, value);
        Ok(())
    }

    /// Add `delta` to the value at `index`.
    pub fn column_plus_equals(&mut self, index: usize, delta: f64) -> VectorResult<()> {
        self.check_index(index)?;
        let value = extended::add(self.values[index], delta);
        self.store(index, value);
        Ok(())
    }

    /// Set every position to `value`.
    pub fn set_all(&mut self, value: f64) {
        self.values.fill(value);
        self.has_infinite = value.is_infinite() && !self.values.is_empty();
    }

    /// `self += other * factor`, position by position.
    pub fn plus_equals(&mut self, other: &DenseVector, factor: f64) -> VectorResult<()> {
        self.plus_equals_with(simd::kernel(), other, factor)
    }

    /// [`DenseVector::plus_equals`] running on `kernel`.
    pub fn plus_equals_with(
        &mut self,
        kernel: &dyn DenseKernel,
        other: &DenseVector,
        factor: f64,
    ) -> VectorResult<()> {
        if other.len() != self.len() {
            return Err(VectorError::DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        if !self.has_infinite && !other.has_infinite && factor.is_finite() {
            kernel.axpy(&mut self.values, &other.values, factor);
            // Overflow can still produce an infinity.
            self.rescan();
            return Ok(());
        }
        tracing::trace!(len = self.len(), "dense plus_equals on extended path");
        for (acc, &src) in self.values.iter_mut().zip(&other.values) {
            *acc = extended::add_scaled(*acc, src, factor);
        }
        self.rescan();
        Ok(())
    }

    /// `self[i] += other[i] * factor` for every present entry of `other`.
    ///
    /// Fails without modifying `self` if `other` has an index beyond this
    /// vector's size.
    pub fn plus_equals_sparse(&mut self, other: &dyn Vector, factor: f64) -> VectorResult<()> {
        self.check_fits(other)?;
        for (index, value) in Entries::new(other) {
            let sum = extended::add_scaled(self.values[index], value, factor);
            self.store(index, sum);
        }
        Ok(())
    }

    fn check_fits(&self, other: &dyn Vector) -> VectorResult<()> {
        for (index, _) in Entries::new(other) {
            self.check_index(index)?;
        }
        Ok(())
    }

    /// Multiply every position by `factor`.
    pub fn times_equals(&mut self, factor: f64) {
        self.times_equals_with(simd::kernel(), factor);
    }

    pub fn times_equals_with(&mut self, kernel: &dyn DenseKernel, factor: f64) {
        if !self.has_infinite && factor.is_finite() {
            kernel.scale(&mut self.values, factor);
        } else {
            for v in &mut self.values {
                *v = extended::mul(*v, factor);
            }
        }
        self.rescan();
    }

    /// `self[i] *= other[i] * factor` for every position; positions absent
    /// from `other` become zero.
    pub fn times_equals_vector(&mut self, other: &dyn Vector, factor: f64) {
        for index in 0..self.values.len() {
            let scale = extended::mul(other.value(index), factor);
            self.values[index] = extended::mul(self.values[index], scale);
        }
        self.rescan();
    }

    /// `self = other * factor`; positions absent from `other` become zero.
    pub fn set_with_factor(&mut self, other: &dyn Vector, factor: f64) -> VectorResult<()> {
        self.check_fits(other)?;
        self.values.fill(0.0);
        self.has_infinite = false;
        for (index, value) in Entries::new(other) {
            self.store(index, extended::mul(value, factor));
        }
        Ok(())
    }

    /// Add `addend` to every position.
    pub fn set_with_addend(&mut self, addend: f64) {
        for v in &mut self.values {
            *v = extended::add(*v, addend);
        }
        self.rescan();
    }

    /// Signed sum of all positions.
    pub fn sum(&self) -> f64 {
        self.sum_with(simd::kernel())
    }

    pub fn sum_with(&self, kernel: &dyn DenseKernel) -> f64 {
        if self.has_infinite {
            return self.values.iter().fold(0.0, |acc, &v| extended::add(acc, v));
        }
        kernel.sum(&self.values)
    }

    /// Mean value (NaN for an empty vector).
    pub fn mean(&self) -> f64 {
        self.sum() / self.values.len() as f64
    }

    /// Largest value, or `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Smallest value, or `None` when empty.
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// Index of the largest value (first on ties), or `None` when empty.
    pub fn max_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    fn divide_by(&mut self, norm: f64) -> f64 {
        if norm == 0.0 {
            return norm;
        }
        for v in &mut self.values {
            *v /= norm;
        }
        self.rescan();
        norm
    }

    /// Divide by the signed sum so the values sum to one.
    ///
    /// Returns the sum. A zero sum leaves the values unchanged.
    pub fn normalize(&mut self) -> f64 {
        let norm = self.sum();
        self.divide_by(norm)
    }

    /// Divide by the sum of absolute values. A zero norm leaves the values unchanged.
    pub fn one_normalize(&mut self) -> f64 {
        let norm = self.abs_norm();
        self.divide_by(norm)
    }

    /// Divide by the Euclidean norm. A zero norm leaves the values unchanged.
    pub fn two_normalize(&mut self) -> f64 {
        let norm = self.two_norm();
        self.divide_by(norm)
    }

    /// Divide by the largest absolute value. A zero norm leaves the values unchanged.
    pub fn infinity_normalize(&mut self) -> f64 {
        let norm = self.infinity_norm();
        self.divide_by(norm)
    }
}

impl From<Vec<f64>> for DenseVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl Vector for DenseVector {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn num_locations(&self) -> usize {
        self.values.len()
    }

    fn index_at_location(&self, location: usize) -> usize {
        debug_assert!(location < self.values.len());
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

    fn value(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }
}
