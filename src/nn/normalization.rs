//! Batch normalization over the hidden units of a dense layer.
//!
//! # References
//!
//! - Ioffe, S., & Szegedy, C. (2015). Batch normalization: Accelerating deep
//!   network training by reducing internal covariate shift. ICML.

use super::optim::ParamGrad;
use crate::error::{Result, SparseError};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Batch normalization for `(batch, features)` input.
///
/// ```text
/// y = (x - E[x]) / sqrt(Var[x] + ε) * γ + β
/// ```
///
/// Training uses batch statistics and updates exponential running
/// averages (`momentum` 0.1, unbiased variance). Evaluation uses the running
/// averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNorm1d {
    eps: f32,
    momentum: f32,
    /// Learnable scale
    gamma: Vec<f32>,
    /// Learnable shift
    beta: Vec<f32>,
    grad_gamma: Vec<f32>,
    grad_beta: Vec<f32>,
    running_mean: Vec<f32>,
    running_var: Vec<f32>,
    #[serde(skip)]
    cache: Option<NormCache>,
}

#[derive(Debug, Clone, PartialEq)]
struct NormCache {
    x_hat: Matrix<f32>,
    inv_std: Vec<f32>,
}

impl BatchNorm1d {
    /// Create a new `BatchNorm1d` layer with γ = 1, β = 0.
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self {
            eps: 1e-5,
            momentum: 0.1,
            gamma: vec![1.0; num_features],
            beta: vec![0.0; num_features],
            grad_gamma: vec![0.0; num_features],
            grad_beta: vec![0.0; num_features],
            running_mean: vec![0.0; num_features],
            running_var: vec![1.0; num_features],
            cache: None,
        }
    }

    /// Set momentum for running statistics update.
    #[must_use]
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    /// Set epsilon for numerical stability.
    #[must_use]
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    /// Number of normalized features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.gamma.len()
    }

    /// Running mean used in evaluation mode.
    #[must_use]
    pub fn running_mean(&self) -> &[f32] {
        &self.running_mean
    }

    /// Running variance used in evaluation mode.
    #[must_use]
    pub fn running_var(&self) -> &[f32] {
        &self.running_var
    }

    /// Named state tensors: scale, shift and running statistics.
    pub(super) fn tensors(&self) -> [(&'static str, &[f32]); 4] {
        [
            ("weight", self.gamma.as_slice()),
            ("bias", self.beta.as_slice()),
            ("running_mean", self.running_mean.as_slice()),
            ("running_var", self.running_var.as_slice()),
        ]
    }

    /// Mutable views of [`BatchNorm1d::tensors`], same order.
    pub(super) fn tensors_mut(&mut self) -> [&mut [f32]; 4] {
        [
            self.gamma.as_mut_slice(),
            self.beta.as_mut_slice(),
            self.running_mean.as_mut_slice(),
            self.running_var.as_mut_slice(),
        ]
    }

    /// Training forward pass with batch statistics.
    ///
    /// # Errors
    ///
    /// Returns an error on a feature-count mismatch or an empty batch.
    pub fn forward(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.check_width(x)?;
        let (n, features) = x.shape();
        if n == 0 {
            return Err(SparseError::empty_input("batch normalization batch"));
        }

        let mut x_hat = Matrix::zeros(n, features);
        let mut inv_std = vec![0.0; features];
        for f in 0..features {
            let mean = (0..n).map(|r| f64::from(x.get(r, f))).sum::<f64>() / n as f64;
            let var = (0..n)
                .map(|r| (f64::from(x.get(r, f)) - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            let istd = 1.0 / (var + f64::from(self.eps)).sqrt();
            for r in 0..n {
                x_hat.set(r, f, ((f64::from(x.get(r, f)) - mean) * istd) as f32);
            }
            inv_std[f] = istd as f32;

            let unbiased = if n > 1 { var * n as f64 / (n - 1) as f64 } else { var };
            let m = self.momentum;
            self.running_mean[f] = (1.0 - m) * self.running_mean[f] + m * mean as f32;
            self.running_var[f] = (1.0 - m) * self.running_var[f] + m * unbiased as f32;
        }

        let out = self.scale_shift(&x_hat);
        self.cache = Some(NormCache { x_hat, inv_std });
        Ok(out)
    }

    /// Evaluation forward pass with running statistics.
    ///
    /// # Errors
    ///
    /// Returns an error on a feature-count mismatch.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.check_width(x)?;
        let mut x_hat = x.clone();
        for r in 0..x_hat.n_rows() {
            for (f, v) in x_hat.row_slice_mut(r).iter_mut().enumerate() {
                *v = (*v - self.running_mean[f]) / (self.running_var[f] + self.eps).sqrt();
            }
        }
        Ok(self.scale_shift(&x_hat))
    }

    /// Backward pass through the batch statistics.
    ///
    /// ```text
    /// dx = γ/σ · (g - mean(g) - x̂ · mean(g ⊙ x̂))
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if no training forward pass preceded this call or
    /// the gradient shape differs from the cached batch.
    pub fn backward(&mut self, grad_out: &Matrix<f32>) -> Result<Matrix<f32>> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            SparseError::InvalidState("batch norm backward called before forward".to_string())
        })?;
        if grad_out.shape() != cache.x_hat.shape() {
            return Err(SparseError::shape_mismatch(
                cache.x_hat.shape(),
                grad_out.shape(),
            ));
        }

        let (n, features) = grad_out.shape();
        let mut grad_in = Matrix::zeros(n, features);
        for f in 0..features {
            let mut sum_g = 0.0_f64;
            let mut sum_gx = 0.0_f64;
            for r in 0..n {
                let g = f64::from(grad_out.get(r, f));
                sum_g += g;
                sum_gx += g * f64::from(cache.x_hat.get(r, f));
            }
            self.grad_beta[f] = sum_g as f32;
            self.grad_gamma[f] = sum_gx as f32;

            let scale = f64::from(self.gamma[f]) * f64::from(cache.inv_std[f]);
            let mean_g = sum_g / n as f64;
            let mean_gx = sum_gx / n as f64;
            for r in 0..n {
                let g = f64::from(grad_out.get(r, f));
                let xh = f64::from(cache.x_hat.get(r, f));
                grad_in.set(r, f, (scale * (g - mean_g - xh * mean_gx)) as f32);
            }
        }
        Ok(grad_in)
    }

    /// Parameters paired with their gradients: γ, then β.
    pub fn params_mut(&mut self) -> [ParamGrad<'_>; 2] {
        [
            ParamGrad {
                value: &mut self.gamma,
                grad: &self.grad_gamma,
            },
            ParamGrad {
                value: &mut self.beta,
                grad: &self.grad_beta,
            },
        ]
    }

    fn scale_shift(&self, x_hat: &Matrix<f32>) -> Matrix<f32> {
        let mut out = x_hat.clone();
        for r in 0..out.n_rows() {
            for (f, v) in out.row_slice_mut(r).iter_mut().enumerate() {
                *v = *v * self.gamma[f] + self.beta[f];
            }
        }
        out
    }

    fn check_width(&self, x: &Matrix<f32>) -> Result<()> {
        if x.n_cols() != self.num_features() {
            return Err(SparseError::dimension_mismatch(
                "batch norm features",
                self.num_features(),
                x.n_cols(),
            ));
        }
        Ok(())
    }
}
