//! AVX2 (256-bit) SIMD kernel for x86_64 dense arithmetic.
//!
//! Processes four `f64` lanes per register and falls through to scalar code
//! for tail elements that don't fill a full register.

use super::{DenseKernel, IsaLevel};

/// AVX2-accelerated dense kernel.
#[derive(Debug, Clone, Copy)]
pub struct Avx2Kernel;

const LANES: usize = 4;

#[cfg(target_arch = "x86_64")]
impl DenseKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Avx2
    }

    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());

        if is_x86_feature_detected!("avx2") {
            // Safety: we've confirmed AVX2 support at runtime.
            unsafe { self.dot_avx2(a, b) }
        } else {
            super::generic::GenericKernel.dot(a, b)
        }
    }

    fn axpy(&self, acc: &mut [f64], src: &[f64], factor: f64) {
        debug_assert_eq!(acc.len(), src.len());

        if is_x86_feature_detected!("avx2") {
            unsafe { self.axpy_avx2(acc, src, factor) }
        } else {
            super::generic::GenericKernel.axpy(acc, src, factor);
        }
    }

    fn scale(&self, data: &mut [f64], factor: f64) {
        if is_x86_feature_detected!("avx2") {
            unsafe { self.scale_avx2(data, factor) }
        } else {
            super::generic::GenericKernel.scale(data, factor);
        }
    }

    fn sum(&self, data: &[f64]) -> f64 {
        // Summation order matters for reproducibility of norms; keep it scalar.
        super::generic::GenericKernel.sum(data)
    }
}

#[cfg(target_arch = "x86_64")]
impl Avx2Kernel {
    #[target_feature(enable = "avx2")]
    unsafe fn dot_avx2(&self, a: &[f64], b: &[f64]) -> f64 {
        use std::arch::x86_64::*;

        let len = a.len();
        let chunks = len / LANES;

        let mut acc;
        unsafe {
            acc = _mm256_setzero_pd();
            for i in 0..chunks {
                let offset = i * LANES;
                let va = _mm256_loadu_pd(a.as_ptr().add(offset));
                let vb = _mm256_loadu_pd(b.as_ptr().add(offset));
                acc = _mm256_add_pd(acc, _mm256_mul_pd(va, vb));
            }
        }

        let mut lanes = [0.0f64; LANES];
        unsafe { _mm256_storeu_pd(lanes.as_mut_ptr(), acc) };
        let mut total = (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]);

        // Scalar tail
        for i in chunks * LANES..len {
            total += a[i] * b[i];
        }
        total
    }

    #[target_feature(enable = "avx2")]
    unsafe fn axpy_avx2(&self, acc: &mut [f64], src: &[f64], factor: f64) {
        use std::arch::x86_64::*;

        let len = acc.len();
        let chunks = len / LANES;

        unsafe {
            let vf = _mm256_set1_pd(factor);
            for i in 0..chunks {
                let offset = i * LANES;
                let va = _mm256_loadu_pd(acc.as_ptr().add(offset));
                let vs = _mm256_loadu_pd(src.as_ptr().add(offset));
                let result = _mm256_add_pd(va, _mm256_mul_pd(vs, vf));
                _mm256_storeu_pd(acc.as_mut_ptr().add(offset), result);
            }
        }

        for i in chunks * LANES..len {
            acc[i] += src[i] * factor;
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn scale_avx2(&self, data: &mut [f64], factor: f64) {
        use std::arch::x86_64::*;

        let len = data.len();
        let chunks = len / LANES;

        unsafe {
            let vf = _mm256_set1_pd(factor);
            for i in 0..chunks {
                let offset = i * LANES;
                let v = _mm256_loadu_pd(data.as_ptr().add(offset));
                _mm256_storeu_pd(data.as_mut_ptr().add(offset), _mm256_mul_pd(v, vf));
            }
        }

        for v in &mut data[chunks * LANES..] {
            *v *= factor;
        }
    }
}

// Provide a stub for non-x86_64 targets so the module compiles.
#[cfg(not(target_arch = "x86_64"))]
impl DenseKernel for Avx2Kernel {
    fn isa_level(&self) -> IsaLevel {
        IsaLevel::Generic
    }
    fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        super::generic::GenericKernel.dot(a, b)
    }
    fn axpy(&self, acc: &mut [f64], src: &[f64], factor: f64) {
        super::generic::GenericKernel.axpy(acc, src, factor);
    }
    fn scale(&self, data: &mut [f64], factor: f64) {
        super::generic::GenericKernel.scale(data, factor);
    }
    fn sum(&self, data: &[f64]) -> f64 {
        super::generic::GenericKernel.sum(data)
    }
}
