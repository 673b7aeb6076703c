//! Sparse vectors with an optional lazily built index accelerator.
//!
//! A [`SparseVector`] stores a strictly ascending index array and, unless it
//! is *binary*, a parallel value array. Without an index array the vector is
//! laid out densely (location == index).
//!
//! Random access (`location(index)`) is a binary search by default. A vector
//! may carry an accelerator that maps index → location in O(1):
//!
//! - [`AcceleratorKind::Array`]: a dense array sized to the largest index,
//!   for modest or contiguous index domains;
//! - [`AcceleratorKind::Hash`]: a hash map, for large sparse domains.
//!
//! The accelerator is built on the first operation that needs it and dropped
//! whenever the index set changes. It never changes a result.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{Entries, Vector, VectorResult, extended};
use crate::config::AlgebraConfig;
use crate::error::VectorError;

/// Which index → location accelerator a sparse vector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AcceleratorKind {
    /// Binary search over the index array.
    #[default]
    None,
    /// Dense array indexed by index, holding locations.
    Array,
    /// Hash map from index to location.
    Hash,
}

impl std::fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceleratorKind::None => write!(f, "none"),
            AcceleratorKind::Array => write!(f, "array"),
            AcceleratorKind::Hash => write!(f, "hash"),
        }
    }
}

/// Construction options for [`SparseVector::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Requested domain size; grown to cover the largest index.
    pub size: Option<usize>,
    /// Sort the indices. When unset they are only checked.
    pub sort: bool,
    /// Combine duplicate indices. When unset a duplicate is an error.
    pub merge_duplicates: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            size: None,
            sort: true,
            merge_duplicates: true,
        }
    }
}

impl BuildOptions {
    /// Options for indices known to be strictly ascending.
    pub fn presorted() -> Self {
        Self {
            size: None,
            sort: false,
            merge_duplicates: false,
        }
    }

    /// Set the requested domain size.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

const NOT_PRESENT: usize = usize::MAX;

/// Built accelerator structure.
#[derive(Debug, Clone)]
enum AcceleratorIndex {
    Array(Vec<usize>),
    Hash(HashMap<usize, usize>),
}

impl AcceleratorIndex {
    fn build(kind: AcceleratorKind, indices: &[usize]) -> Option<Self> {
        match kind {
            AcceleratorKind::None => None,
            AcceleratorKind::Array => {
                let len = indices.last().map_or(0, |&max| max + 1);
                let mut table = vec![NOT_PRESENT; len];
                for (location, &index) in indices.iter().enumerate() {
                    table[index] = location;
                }
                tracing::debug!(slots = len, present = indices.len(), "built array accelerator");
                Some(AcceleratorIndex::Array(table))
            }
            AcceleratorKind::Hash => {
                let map: HashMap<usize, usize> = indices
                    .iter()
                    .enumerate()
                    .map(|(location, &index)| (index, location))
                    .collect();
                tracing::debug!(present = indices.len(), "built hash accelerator");
                Some(AcceleratorIndex::Hash(map))
            }
        }
    }

    fn location(&self, index: usize) -> Option<usize> {
        match self {
            AcceleratorIndex::Array(table) => {
                table.get(index).copied().filter(|&l| l != NOT_PRESENT)
            }
            AcceleratorIndex::Hash(map) => map.get(&index).copied(),
        }
    }
}

/// Sparse vector: sorted indices, optional values, optional accelerator.
#[derive(Debug, Clone)]
pub struct SparseVector {
    /// Strictly ascending; `None` for the dense layout.
    indices: Option<Vec<usize>>,
    /// Parallel to `indices`; `None` for a binary vector.
    values: Option<Vec<f64>>,
    size: usize,
    has_infinite: bool,
    accelerator: AcceleratorKind,
    /// Built on first use; reset whenever the index set changes.
    index: OnceLock<Option<AcceleratorIndex>>,
}

impl SparseVector {
    /// Build from owned index and value arrays.
    ///
    /// `values == None` makes a binary vector. Duplicate indices are summed
    /// (valued) or collapsed (binary) when `merge_duplicates` is set.
    pub fn new(
        mut indices: Vec<usize>,
        mut values: Option<Vec<f64>>,
        options: BuildOptions,
    ) -> VectorResult<Self> {
        if let Some(values) = &values {
            if values.len() != indices.len() {
                return Err(VectorError::LengthMismatch {
                    indices: indices.len(),
                    values: values.len(),
                });
            }
        }

        if options.sort {
            bubble_sort(&mut indices, values.as_deref_mut());
        } else if let Some(location) = first_descent(&indices) {
            return Err(VectorError::Unsorted { location });
        }
        merge_adjacent(&mut indices, &mut values, options.merge_duplicates)?;

        let size = indices
            .last()
            .map_or(0, |&max| max + 1)
            .max(options.size.unwrap_or(0));
        let has_infinite = values.as_deref().is_some_and(extended::any_infinite);

        Ok(Self {
            indices: Some(indices),
            values,
            size,
            has_infinite,
            accelerator: AcceleratorKind::None,
            index: OnceLock::new(),
        })
    }

    /// Build by copying borrowed arrays.
    pub fn from_slices(
        indices: &[usize],
        values: Option<&[f64]>,
        options: BuildOptions,
    ) -> VectorResult<Self> {
        Self::new(indices.to_vec(), values.map(<[f64]>::to_vec), options)
    }

    /// A binary vector over `indices`.
    pub fn binary(indices: Vec<usize>) -> VectorResult<Self> {
        Self::new(indices, None, BuildOptions::default())
    }

    /// A valued vector from `(index, value)` pairs in any order.
    pub fn from_pairs(pairs: &[(usize, f64)]) -> VectorResult<Self> {
        let (indices, values): (Vec<usize>, Vec<f64>) = pairs.iter().copied().unzip();
        Self::new(indices, Some(values), BuildOptions::default())
    }

    /// A vector laid out densely: location == index.
    pub fn dense(values: Vec<f64>) -> Self {
        let has_infinite = extended::any_infinite(&values);
        Self {
            indices: None,
            size: values.len(),
            values: Some(values),
            has_infinite,
            accelerator: AcceleratorKind::None,
            index: OnceLock::new(),
        }
    }

    /// An empty valued vector of domain size `size`.
    pub fn empty(size: usize) -> Self {
        Self {
            indices: Some(Vec::new()),
            values: Some(Vec::new()),
            size,
            has_infinite: false,
            accelerator: AcceleratorKind::None,
            index: OnceLock::new(),
        }
    }

    /// Use the given accelerator from now on. It is built lazily.
    pub fn with_accelerator(mut self, kind: AcceleratorKind) -> Self {
        self.accelerator = kind;
        self.index = OnceLock::new();
        self
    }

    /// Use the accelerator the configuration picks for this vector's shape.
    pub fn with_config(self, config: &AlgebraConfig) -> Self {
        let kind = match &self.indices {
            Some(indices) => config.choose_accelerator(indices.last().copied(), indices.len()),
            None => AcceleratorKind::None,
        };
        self.with_accelerator(kind)
    }

    /// The configured accelerator kind.
    pub fn accelerator(&self) -> AcceleratorKind {
        self.accelerator
    }

    /// Whether the accelerator structure has been built.
    pub fn is_indexed(&self) -> bool {
        matches!(self.index.get(), Some(Some(_)))
    }

    /// Build the accelerator now instead of on first use.
    pub fn index_vector(&self) {
        self.accelerator_index();
    }

    fn accelerator_index(&self) -> Option<&AcceleratorIndex> {
        let indices = self.indices.as_deref()?;
        if self.accelerator == AcceleratorKind::None {
            return None;
        }
        self.index
            .get_or_init(|| AcceleratorIndex::build(self.accelerator, indices))
            .as_ref()
    }

    fn invalidate_index(&mut self) {
        self.index = OnceLock::new();
    }

    /// The index array, or `None` for the dense layout.
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    /// The value array, or `None` for a binary vector.
    pub fn values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }

    /// Whether location == index for every position.
    pub fn is_dense_layout(&self) -> bool {
        self.indices.is_none()
    }

    /// Largest present index.
    pub fn max_index(&self) -> Option<usize> {
        match &self.indices {
            Some(indices) => indices.last().copied(),
            None => self.size.checked_sub(1),
        }
    }

    fn values_mut(&mut self) -> VectorResult<&mut Vec<f64>> {
        self.values.as_mut().ok_or(VectorError::BinaryVector)
    }

    fn store(&mut self, location: usize, value: f64) -> VectorResult<()> {
        let values = self.values_mut()?;
        values[location] = value;
        self.has_infinite |= value.is_infinite();
        Ok(())
    }

    /// Set the value at a present `index`.
    ///
    /// Never inserts: an absent index is an error.
    pub fn set_value(&mut self, index: usize, value: f64) -> VectorResult<()> {
        let location = self
            .location(index)
            .ok_or(VectorError::AbsentIndex { index })?;
        self.store(location, value)
    }

    /// Set the value at `location`.
    pub fn set_value_at_location(&mut self, location: usize, value: f64) -> VectorResult<()> {
        let size = self.num_locations();
        if location >= size {
            return Err(VectorError::IndexOutOfRange {
                index: location,
                size,
            });
        }
        self.store(location, value)
    }

    /// Add `delta` to the value at a present `index`.
    pub fn column_plus_equals(&mut self, index: usize, delta: f64) -> VectorResult<()> {
        let location = self
            .location(index)
            .ok_or(VectorError::AbsentIndex { index })?;
        let current = self.values_mut()?[location];
        self.store(location, extended::add(current, delta))
    }

    /// Set every present value to `value`.
    pub fn set_all(&mut self, value: f64) -> VectorResult<()> {
        let values = self.values_mut()?;
        values.fill(value);
        let stored = !values.is_empty();
        self.has_infinite = value.is_infinite() && stored;
        Ok(())
    }

    /// `self[i] += other[i] * factor` for every index present in both.
    ///
    /// Indices of `other` absent from `self` are ignored; the index set of
    /// `self` never changes.
    pub fn plus_equals_sparse(&mut self, other: &dyn Vector, factor: f64) -> VectorResult<()> {
        if self.values.is_none() {
            return Err(VectorError::BinaryVector);
        }
        let plain = !self.has_infinite && !other.has_infinite() && factor.is_finite();
        let combine = |acc: f64, term: f64| {
            if plain {
                acc + term * factor
            } else {
                extended::add_scaled(acc, term, factor)
            }
        };

        if other.num_locations() <= self.num_locations() {
            for (index, term) in Entries::new(other) {
                if let Some(location) = self.location(index) {
                    let current = self.values_mut()?[location];
                    self.store(location, combine(current, term))?;
                }
            }
        } else {
            for location in 0..self.num_locations() {
                let index = self.index_at_location(location);
                if let Some(other_location) = other.location(index) {
                    let term = other.value_at_location(other_location);
                    let current = self.values_mut()?[location];
                    self.store(location, combine(current, term))?;
                }
            }
        }
        Ok(())
    }

    /// Multiply every present value by `factor`.
    pub fn times_equals(&mut self, factor: f64) -> VectorResult<()> {
        let values = self.values_mut()?;
        for v in values.iter_mut() {
            *v = extended::mul(*v, factor);
        }
        let has_infinite = extended::any_infinite(values);
        self.has_infinite = has_infinite;
        Ok(())
    }

    /// `self[i] *= other[i] * factor` for every present index of `self`;
    /// indices absent from `other` become zero.
    pub fn times_equals_sparse(&mut self, other: &dyn Vector, factor: f64) -> VectorResult<()> {
        if self.values.is_none() {
            return Err(VectorError::BinaryVector);
        }
        for location in 0..self.num_locations() {
            let index = self.index_at_location(location);
            let scale = extended::mul(other.value(index), factor);
            let current = self.values_mut()?[location];
            self.store(location, extended::mul(current, scale))?;
        }
        let has_infinite = self.values.as_deref().is_some_and(extended::any_infinite);
        self.has_infinite = has_infinite;
        Ok(())
    }

    /// Append `value` at `index`, keeping indices sorted and unique.
    ///
    /// A repeated index accumulates. Built accelerators are discarded.
    pub fn add(&mut self, index: usize, value: f64) -> VectorResult<()> {
        if self.values.is_none() {
            return Err(VectorError::BinaryVector);
        }
        if self.indices.is_none() {
            let size = self.size;
            if index >= size {
                return Err(VectorError::IndexOutOfRange { index, size });
            }
            return self.column_plus_equals(index, value);
        }
        self.insert(index, Some(value));
        Ok(())
    }

    /// Append `index` with value 1.0.
    ///
    /// On a binary vector a repeated index is a no-op; on a valued vector it
    /// accumulates 1.0.
    pub fn add_index(&mut self, index: usize) -> VectorResult<()> {
        if self.values.is_some() {
            return self.add(index, 1.0);
        }
        if self.indices.is_none() {
            return Err(VectorError::BinaryVector);
        }
        self.insert(index, None);
        Ok(())
    }

    fn insert(&mut self, index: usize, value: Option<f64>) {
        let Some(indices) = self.indices.as_mut() else {
            return;
        };
        indices.push(index);
        if let (Some(values), Some(value)) = (self.values.as_mut(), value) {
            values.push(value);
            self.has_infinite |= value.is_infinite();
        }

        // Bubble the new element backwards into place.
        let mut j = indices.len() - 1;
        while j > 0 && indices[j - 1] > indices[j] {
            indices.swap(j - 1, j);
            if let Some(values) = self.values.as_mut() {
                values.swap(j - 1, j);
            }
            j -= 1;
        }

        // Only the left neighbour can be equal.
        if j > 0 && indices[j - 1] == index {
            indices.remove(j);
            if let Some(values) = self.values.as_mut() {
                let merged = values.remove(j);
                values[j - 1] = extended::add(values[j - 1], merged);
            }
        }

        self.size = self.size.max(index + 1);
        self.invalidate_index();
    }

    /// Grow the logical domain size. Never shrinks.
    pub fn extend_size(&mut self, size: usize) {
        self.size = self.size.max(size);
    }
}

/// Insertion-style backward bubble sort over co-indexed arrays.
///
/// Linear on sorted input or input with a few appended elements.
fn bubble_sort(indices: &mut [usize], mut values: Option<&mut [f64]>) {
    for i in 1..indices.len() {
        let mut j = i;
        while j > 0 && indices[j - 1] > indices[j] {
            indices.swap(j - 1, j);
            if let Some(values) = values.as_deref_mut() {
                values.swap(j - 1, j);
            }
            j -= 1;
        }
    }
}

/// Location of the first element smaller than its predecessor.
fn first_descent(indices: &[usize]) -> Option<usize> {
    indices
        .windows(2)
        .position(|w| w[0] > w[1])
        .map(|p| p + 1)
}

/// Combine runs of equal adjacent indices in place.
fn merge_adjacent(
    indices: &mut Vec<usize>,
    values: &mut Option<Vec<f64>>,
    allow: bool,
) -> VectorResult<()> {
    if indices.len() < 2 {
        return Ok(());
    }
    let mut write = 0;
    for read in 1..indices.len() {
        if indices[read] == indices[write] {
            if !allow {
                return Err(VectorError::DuplicateIndex {
                    index: indices[read],
                });
            }
            if let Some(values) = values.as_mut() {
                values[write] = extended::add(values[write], values[read]);
            }
        } else {
            write += 1;
            indices[write] = indices[read];
            if let Some(values) = values.as_mut() {
                values[write] = values[read];
            }
        }
    }
    let len = write + 1;
    indices.truncate(len);
    if let Some(values) = values.as_mut() {
        values.truncate(len);
    }
    Ok(())
}

impl PartialEq for SparseVector {
    /// Equal when they hold the same layout, entries and domain size.
    /// Accelerators are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.indices == other.indices && self.values == other.values && self.size == other.size
    }
}

impl Vector for SparseVector {
    fn size(&self) -> usize {
        self.size
    }

    fn num_locations(&self) -> usize {
        match (&self.indices, &self.values) {
            (Some(indices), _) => indices.len(),
            (None, Some(values)) => values.len(),
            (None, None) => 0,
        }
    }

    fn index_at_location(&self, location: usize) -> usize {
        match &self.indices {
            Some(indices) => indices[location],
            None => location,
        }
    }

    fn value_at_location(&self, location: usize) -> f64 {
        match &self.values {
            Some(values) => values[location],
            None => {
                debug_assert!(location < self.num_locations());
                1.0
            }
        }
    }

    fn location(&self, index: usize) -> Option<usize> {
        let Some(indices) = self.indices.as_deref() else {
            return (index < self.num_locations()).then_some(index);
        };
        match self.accelerator_index() {
            Some(accelerator) => accelerator.location(index),
            None => indices.binary_search(&index).ok(),
        }
    }

    fn has_infinite(&self) -> bool {
        self.has_infinite
    }

    fn dense_values(&self) -> Option<&[f64]> {
        match &self.indices {
            Some(_) => None,
            None => self.values.as_deref(),
        }
    }

    fn is_binary(&self) -> bool {
        self.values.is_none()
    }
}
