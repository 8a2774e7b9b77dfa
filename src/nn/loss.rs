//! Regression losses with analytic gradients.
//!
//! Losses are accumulated in `f64`; the gradient w.r.t. the prediction is
//! returned as an `f32` matrix shaped like the prediction.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::nn::{Loss, Reduction};
//! use sparse_fcnn::primitives::{Matrix, Vector};
//!
//! let pred = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1");
//! let target = Vector::from_slice(&[1.0, 2.0, 5.0]);
//! let (loss, grad) = Loss::Mse.evaluate(&pred, &target, Reduction::Sum).expect("same length");
//! assert!((loss - 4.0).abs() < 1e-12);
//! assert_eq!(grad.as_slice(), &[0.0, 0.0, -4.0]);
//! ```
//!
//! # References
//!
//! - Girshick, R. (2015). Fast R-CNN. ICCV (smooth L1).

use crate::error::{Result, SparseError};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Reduction over the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Sum of per-sample losses.
    #[default]
    Sum,
    /// Mean of per-sample losses.
    Mean,
}

/// Regression loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Squared error `(p - y)²`.
    #[default]
    Mse,
    /// Smooth L1 (Huber) with β = 1:
    ///
    /// ```text
    /// loss = 0.5 * x²,      if |x| < 1
    ///      = |x| - 0.5,     otherwise
    /// ```
    SmoothL1,
}

impl Loss {
    /// Per-sample loss and derivative for residual `x = p - y`.
    fn pointwise(self, x: f64) -> (f64, f64) {
        match self {
            Self::Mse => (x * x, 2.0 * x),
            Self::SmoothL1 => {
                if x.abs() < 1.0 {
                    (0.5 * x * x, x)
                } else {
                    (x.abs() - 0.5, x.signum())
                }
            }
        }
    }

    /// Loss value and gradient w.r.t. `pred`.
    ///
    /// `pred` is the network output, one row per sample and a single column.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if `pred` isn't `(target.len(), 1)`, or
    /// an empty-input error for an empty batch.
    pub fn evaluate(
        self,
        pred: &Matrix<f32>,
        target: &Vector<f32>,
        reduction: Reduction,
    ) -> Result<(f64, Matrix<f32>)> {
        if pred.shape() != (target.len(), 1) {
            return Err(SparseError::shape_mismatch((target.len(), 1), pred.shape()));
        }
        if target.is_empty() {
            return Err(SparseError::empty_input("loss batch"));
        }

        let scale = match reduction {
            Reduction::Sum => 1.0,
            Reduction::Mean => 1.0 / target.len() as f64,
        };

        let mut total = 0.0_f64;
        let mut grad = Vec::with_capacity(target.len());
        for (&p, &y) in pred.as_slice().iter().zip(target.as_slice()) {
            let (l, d) = self.pointwise(f64::from(p) - f64::from(y));
            total += l;
            grad.push((d * scale) as f32);
        }
        let grad = Matrix::from_vec(target.len(), 1, grad)?;
        Ok((total * scale, grad))
    }

    /// Loss value only.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Loss::evaluate`].
    pub fn value(
        self,
        pred: &Matrix<f32>,
        target: &Vector<f32>,
        reduction: Reduction,
    ) -> Result<f64> {
        self.evaluate(pred, target, reduction).map(|(l, _)| l)
    }
}
