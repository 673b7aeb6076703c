//! SIMD-accelerated kernels for dense vector arithmetic.
//!
//! This module provides a `DenseKernel` trait with CPU-specific implementations.
//! At runtime, [`detect_isa`] determines the best available instruction set and
//! [`kernel`] returns the fastest implementation for the current CPU.
//!
//! Kernels implement plain IEEE arithmetic only. Callers route operands that
//! hold infinities through `vector::extended` instead.
//!
//! # Supported ISA levels
//!
//! - **Generic**: Pure-Rust scalar fallback, works everywhere
//! - **AVX2**: 256-bit SIMD for x86_64 systems with AVX2 support

pub mod avx2;
pub mod generic;

use std::sync::OnceLock;

use crate::config::KernelChoice;

/// Instruction set architecture level detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IsaLevel {
    /// Pure-Rust scalar operations, no SIMD.
    Generic,
    /// x86_64 AVX2 (256-bit vectors).
    Avx2,
}

impl std::fmt::Display for IsaLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsaLevel::Generic => write!(f, "Generic (scalar)"),
            IsaLevel::Avx2 => write!(f, "AVX2 (256-bit)"),
        }
    }
}

/// Detect the best ISA level available on the current CPU.
pub fn detect_isa() -> IsaLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return IsaLevel::Avx2;
        }
    }
    IsaLevel::Generic
}

/// Trait for SIMD-accelerated dense kernels.
///
/// Each method operates on raw `f64` slices holding dense vector values.
/// Slices passed together must have the same length.
pub trait DenseKernel: Send + Sync {
    /// The ISA level this kernel targets.
    fn isa_level(&self) -> IsaLevel;

    /// Inner product of two slices.
    fn dot(&self, a: &[f64], b: &[f64]) -> f64;

    /// `acc[i] += src[i] * factor` for every position.
    fn axpy(&self, acc: &mut [f64], src: &[f64], factor: f64);

    /// `data[i] *= factor` for every position.
    fn scale(&self, data: &mut [f64], factor: f64);

    /// Sum of all values.
    fn sum(&self, data: &[f64]) -> f64;
}

static GENERIC: generic::GenericKernel = generic::GenericKernel;
#[cfg(target_arch = "x86_64")]
static AVX2: avx2::Avx2Kernel = avx2::Avx2Kernel;

static BEST: OnceLock<&'static dyn DenseKernel> = OnceLock::new();

/// Return the best available kernel for the current CPU.
///
/// Detection runs once per process.
pub fn kernel() -> &'static dyn DenseKernel {
    *BEST.get_or_init(|| {
        let chosen: &'static dyn DenseKernel = match detect_isa() {
            #[cfg(target_arch = "x86_64")]
            IsaLevel::Avx2 => &AVX2,
            _ => &GENERIC,
        };
        tracing::debug!(isa = %chosen.isa_level(), "selected dense kernel");
        chosen
    })
}

/// Return the kernel requested by configuration.
pub fn kernel_for(choice: KernelChoice) -> &'static dyn DenseKernel {
    match choice {
        KernelChoice::Auto => kernel(),
        KernelChoice::Generic => &GENERIC,
    }
}
