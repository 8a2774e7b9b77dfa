//! Seeded synthetic regression data with known informative features.
//!
//! Each sample draws every feature from N(0, 1); the label is a linear
//! combination of `n_informative` randomly chosen features plus Gaussian
//! noise. The remaining features carry no signal, so a feature selector can
//! be scored against the returned ground truth.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::synthetic::make_regression;
//!
//! let synth = make_regression(200, 50, 5, 0.1, 42).expect("valid sizes");
//! assert_eq!(synth.dataset.n_features(), 50);
//! assert_eq!(synth.informative.len(), 5);
//! ```

use crate::data::Dataset;
use crate::error::{Result, SparseError};
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Generated dataset with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticRegression {
    /// Features and labels.
    pub dataset: Dataset,
    /// Indices of the informative features, ascending.
    pub informative: Vec<usize>,
    /// Coefficient of every feature (zero for noise features).
    pub coefficients: Vec<f32>,
}

/// Generates a linear regression problem.
///
/// Informative coefficients have magnitude in `[1, 2)` and a random sign.
///
/// # Errors
///
/// Returns an error if `n_samples` or `n_features` is zero, if
/// `n_informative` exceeds `n_features`, or if `noise` is negative or
/// non-finite.
pub fn make_regression(
    n_samples: usize,
    n_features: usize,
    n_informative: usize,
    noise: f32,
    seed: u64,
) -> Result<SyntheticRegression> {
    if n_samples == 0 || n_features == 0 {
        return Err(SparseError::empty_input("synthetic dataset"));
    }
    if n_informative > n_features {
        return Err(SparseError::invalid_hyperparameter(
            "n_informative",
            n_informative,
            "<= n_features",
        ));
    }
    if !(noise.is_finite() && noise >= 0.0) {
        return Err(SparseError::invalid_hyperparameter("noise", noise, "finite and >= 0"));
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let mut order: Vec<usize> = (0..n_features).collect();
    order.shuffle(&mut rng);
    let mut informative = order[..n_informative].to_vec();
    informative.sort_unstable();

    let mut coefficients = vec![0.0_f32; n_features];
    for &j in &informative {
        let magnitude: f32 = rng.gen_range(1.0..2.0);
        coefficients[j] = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
    }

    let data: Vec<f32> = (0..n_samples * n_features)
        .map(|_| randn(&mut rng) as f32)
        .collect();
    let x = Matrix::from_vec(n_samples, n_features, data)?;

    let labels: Vec<f32> = (0..n_samples)
        .map(|r| {
            let signal: f64 = x
                .row_slice(r)
                .iter()
                .zip(&coefficients)
                .map(|(&v, &b)| f64::from(v) * f64::from(b))
                .sum();
            (signal + f64::from(noise) * randn(&mut rng)) as f32
        })
        .collect();

    Ok(SyntheticRegression {
        dataset: Dataset::new(x, Vector::from_vec(labels))?,
        informative,
        coefficients,
    })
}

/// Sample standard normal using Box-Muller transform
fn randn(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
