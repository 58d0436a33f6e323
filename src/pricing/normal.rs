//! Standard normal distribution primitives.

use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

/// Standard normal cumulative distribution function, `Φ(x) = P(Z ≤ x)`.
///
/// Evaluated through the complementary error function so that deep tails
/// keep their relative precision.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal probability density function, `φ(x)`.
#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}
