//! Vector algebra core.
//!
//! Every representation implements the [`Vector`] contract: a mapping from
//! non-negative indices to `f64` values where unlisted indices are zero.
//! Present entries are enumerated by *location* `0..num_locations()`; dense
//! representations have location == index.
//!
//! - [`DenseVector`]: every position materialized
//! - [`SparseVector`]: sorted index array, optional values (binary when
//!   absent), optional lazily built accelerator
//! - [`MatrixN`]: flat-array N-dimensional dense matrix
//!
//! Algorithms iterate the contract uniformly; the only representation-specific
//! path is the dense-vs-dense raw slice kernel.

pub mod dense;
pub mod extended;
pub mod matrix;
pub mod sparse;

pub use dense::DenseVector;
pub use matrix::MatrixN;
pub use sparse::{AcceleratorKind, BuildOptions, SparseVector};

use crate::simd::{self, DenseKernel};

/// Result type for vector operations.
pub type VectorResult<T> = std::result::Result<T, crate::error::VectorError>;

/// The shared contract of every vector representation.
pub trait Vector {
    /// Size of the index domain (one past the largest addressable index).
    fn size(&self) -> usize;

    /// Number of present entries.
    fn num_locations(&self) -> usize;

    /// Index stored at `location`. Panics if `location >= num_locations()`.
    fn index_at_location(&self, location: usize) -> usize;

    /// Value stored at `location`. Panics if `location >= num_locations()`.
    fn value_at_location(&self, location: usize) -> f64;

    /// Location of `index`, or `None` if the index is not present.
    fn location(&self, index: usize) -> Option<usize>;

    /// Whether an infinite value may be stored.
    ///
    /// May report `true` after the infinity has been overwritten; never
    /// reports `false` while one is stored.
    fn has_infinite(&self) -> bool;

    /// Raw values when location == index for every position.
    fn dense_values(&self) -> Option<&[f64]> {
        None
    }

    /// Whether every present entry is implicitly 1.0.
    fn is_binary(&self) -> bool {
        false
    }

    /// Value at `index`; 0.0 when absent.
    fn value(&self, index: usize) -> f64 {
        self.location(index)
            .map_or(0.0, |location| self.value_at_location(location))
    }

    /// Iterate `(index, value)` over present entries in location order.
    fn entries(&self) -> Entries<'_>
    where
        Self: Sized,
    {
        Entries::new(self)
    }

    /// Inner product with any other representation.
    fn dot_product(&self, other: &dyn Vector) -> f64
    where
        Self: Sized,
    {
        dot_product(self, other)
    }

    /// Signed sum of the values.
    fn one_norm(&self) -> f64
    where
        Self: Sized,
    {
        Entries::new(self).fold(0.0, |acc, (_, v)| extended::add(acc, v))
    }

    /// Sum of absolute values.
    fn abs_norm(&self) -> f64
    where
        Self: Sized,
    {
        Entries::new(self).map(|(_, v)| v.abs()).sum()
    }

    /// Euclidean norm.
    fn two_norm(&self) -> f64
    where
        Self: Sized,
    {
        Entries::new(self).map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    /// Largest absolute value (0.0 for an empty vector).
    fn infinity_norm(&self) -> f64
    where
        Self: Sized,
    {
        Entries::new(self).fold(0.0, |acc: f64, (_, v)| acc.max(v.abs()))
    }

    /// Whether any present value is NaN.
    fn is_nan(&self) -> bool
    where
        Self: Sized,
    {
        Entries::new(self).any(|(_, v)| v.is_nan())
    }

    /// Materialize into a dense vector of length `size()`.
    fn to_dense(&self) -> DenseVector
    where
        Self: Sized,
    {
        let mut values = vec![0.0; self.size()];
        for (index, value) in Entries::new(self) {
            values[index] = value;
        }
        DenseVector::from_vec(values)
    }
}

/// Iterator over the `(index, value)` pairs of a vector.
pub struct Entries<'a> {
    vector: &'a dyn Vector,
    location: usize,
    end: usize,
}

impl<'a> Entries<'a> {
    /// Iterate the present entries of `vector`.
    pub fn new(vector: &'a dyn Vector) -> Self {
        Self {
            vector,
            location: 0,
            end: vector.num_locations(),
        }
    }
}

impl Iterator for Entries<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.location >= self.end {
            return None;
        }
        let location = self.location;
        self.location += 1;
        Some((
            self.vector.index_at_location(location),
            self.vector.value_at_location(location),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.location;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

/// Inner product of two vectors of any representation.
pub fn dot_product(a: &dyn Vector, b: &dyn Vector) -> f64 {
    dot_product_with(simd::kernel(), a, b)
}

/// Inner product using a specific dense kernel for the dense-vs-dense path.
///
/// The ordinary IEEE computation runs first. Every term goes through
/// [`extended`] arithmetic instead when one side may hold an infinity, or
/// when the fast result is NaN although no operand value is NaN (finite
/// products overflowing to opposite infinities).
pub fn dot_product_with(kernel: &dyn DenseKernel, a: &dyn Vector, b: &dyn Vector) -> f64 {
    let flagged = a.has_infinite() || b.has_infinite();

    if let (Some(x), Some(y)) = (a.dense_values(), b.dense_values()) {
        let n = x.len().min(y.len());
        let (x, y) = (&x[..n], &y[..n]);
        if !flagged {
            let fast = kernel.dot(x, y);
            if !fast.is_nan() || x.iter().chain(y).any(|v| v.is_nan()) {
                return fast;
            }
        }
        tracing::trace!(len = n, "dense dot product on extended path");
        return x
            .iter()
            .zip(y)
            .fold(0.0, |acc, (&p, &q)| extended::add(acc, extended::mul(p, q)));
    }

    // Iterate the operand with fewer present entries and look up the other.
    let (short, long) = if a.num_locations() <= b.num_locations() {
        (a, b)
    } else {
        (b, a)
    };
    if flagged {
        return matched_dot(short, long, true);
    }
    let fast = matched_dot(short, long, false);
    if fast.is_nan() && !holds_nan(short) && !holds_nan(long) {
        tracing::trace!(locations = short.num_locations(), "sparse dot product on extended path");
        return matched_dot(short, long, true);
    }
    fast
}

fn holds_nan(v: &dyn Vector) -> bool {
    Entries::new(v).any(|(_, value)| value.is_nan())
}

/// Sum of products over the indices of `short` that `long` holds.
fn matched_dot(short: &dyn Vector, long: &dyn Vector, use_extended: bool) -> f64 {
    let short_binary = short.is_binary();
    let mut acc = 0.0;
    for location in 0..short.num_locations() {
        let index = short.index_at_location(location);
        let Some(long_location) = long.location(index) else {
            continue;
        };
        let long_value = long.value_at_location(long_location);
        let term = if short_binary {
            long_value
        } else if use_extended {
            extended::mul(short.value_at_location(location), long_value)
        } else {
            short.value_at_location(location) * long_value
        };
        acc = if use_extended {
            extended::add(acc, term)
        } else {
            acc + term
        };
    }
    acc
}
