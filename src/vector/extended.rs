//! Extended arithmetic for combining infinite values.
//!
//! IEEE arithmetic yields NaN for `+∞ + −∞` and for `0 · ∞`. Log-domain
//! models accumulate such values routinely, so every accumulation path in this
//! crate uses these two rules instead:
//!
//! 1. `+∞ + −∞ = 0.0` (in either order);
//! 2. `0 · ±∞ = 0.0` (in either order).
//!
//! Everything else, NaN inputs included, follows IEEE.

/// Addition with opposite infinities cancelling to zero.
#[inline]
pub fn add(a: f64, b: f64) -> f64 {
    if a.is_infinite() && b.is_infinite() && a.is_sign_positive() != b.is_sign_positive() {
        0.0
    } else {
        a + b
    }
}

/// Multiplication with zero absorbing infinities.
#[inline]
pub fn mul(a: f64, b: f64) -> f64 {
    if (a == 0.0 && b.is_infinite()) || (b == 0.0 && a.is_infinite()) {
        0.0
    } else {
        a * b
    }
}

/// `acc + term * factor` under both rules.
#[inline]
pub fn add_scaled(acc: f64, term: f64, factor: f64) -> f64 {
    add(acc, mul(term, factor))
}

/// Whether any value of the slice is infinite.
pub fn any_infinite(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_infinite())
}
