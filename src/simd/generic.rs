//! Pure-Rust scalar fallback for dense kernel operations.
//!
//! This implementation works on all platforms and serves as the reference
//! implementation for correctness testing.

use super::{DenseKernel, IsaLevel};

/// Pure-Rust scalar dense kernel, no SIMD intrinsics.
#[derive(Debug, Clone, Copy)]
pub struct GenericKernel;

impl DenseKernel for GenericKernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
    }

    fn axpy(&self, acc: &mut [f64], src: &[f64], factor: f64) {
        debug_assert_eq!(acc.len(), src.len());
        for (a, &s) in acc.iter_mut().zip(src.iter()) {
            *a += s * factor;
        }
    }

    fn scale(&self, data: &mut [f64], factor: f64) {
        for v in data.iter_mut() {
            *v *= factor;
        }
    }

    fn sum(&self, data: &[f64]) -> f64 {
        data.iter().sum()
    }
}
