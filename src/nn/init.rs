//! Weight initialization.
//!
//! All initializers draw from a caller-owned [`StdRng`] so a whole network
//! is reproducible from a single seed.
//!
//! Dense layers use the fan-in uniform scheme U(-1/√fan_in, 1/√fan_in) for
//! both weights and biases.

use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::Rng;

/// Samples a `rows x cols` matrix from U(-bound, bound).
///
/// A zero bound yields a zero matrix.
#[must_use]
pub fn uniform(rows: usize, cols: usize, bound: f32, rng: &mut StdRng) -> Matrix<f32> {
    let mut m = Matrix::zeros(rows, cols);
    if bound > 0.0 {
        for x in m.as_mut_slice() {
            *x = rng.gen_range(-bound..bound);
        }
    }
    m
}

/// Default bound of a dense layer: `1 / sqrt(fan_in)`.
///
/// Used for both weights and biases of [`Linear`](super::Linear).
#[must_use]
pub fn fan_in_bound(fan_in: usize) -> f32 {
    if fan_in == 0 {
        0.0
    } else {
        1.0 / (fan_in as f32).sqrt()
    }
}
