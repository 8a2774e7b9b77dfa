//! Weight sparsity and feature importance.
//!
//! All functions are pure and tolerate all-zero, all-dense and empty
//! matrices (an empty matrix has 0% sparsity).

use crate::nn::Fcnn;
use crate::primitives::Matrix;
use crate::projection::{group_max_abs, Axis};
use serde::{Deserialize, Serialize};

/// Percentage of groups along `axis` whose entries all satisfy `|w| <= tol`.
///
/// # Example
///
/// ```
/// use sparse_fcnn::metrics::sparsity::sparsity;
/// use sparse_fcnn::primitives::Matrix;
/// use sparse_fcnn::projection::Axis;
///
/// let w = Matrix::from_rows(&[vec![1.0, 0.0, 0.0, 0.2], vec![0.5, 0.0, 0.0, 0.0]]).expect("rect");
/// assert_eq!(sparsity(&w, 1e-3, Axis::Columns), 50.0);
/// assert_eq!(sparsity(&Matrix::zeros(3, 3), 1e-3, Axis::Rows), 100.0);
/// ```
#[must_use]
pub fn sparsity(w: &Matrix<f32>, tol: f32, axis: Axis) -> f64 {
    let maxima = group_max_abs(w, axis);
    if maxima.is_empty() {
        return 0.0;
    }
    let zero = maxima.iter().filter(|&&m| m <= tol).count();
    100.0 * zero as f64 / maxima.len() as f64
}

/// Percentage of individual weights with `|w| <= tol`.
#[must_use]
pub fn weight_sparsity(w: &Matrix<f32>, tol: f32) -> f64 {
    let total = w.as_slice().len();
    if total == 0 {
        return 0.0;
    }
    100.0 * w.count_near_zero(tol) as f64 / total as f64
}

/// Sparsity of one named dense layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSparsity {
    /// Layer name.
    pub name: String,
    /// Weight shape `(out, in)`.
    pub shape: (usize, usize),
    /// Number of weights with `|w| <= tol`.
    pub zeros: usize,
    /// `zeros` as a percentage of all weights.
    pub percentage: f64,
}

/// Per-layer fraction of zero weights, input layer first.
#[must_use]
pub fn layer_sparsity(network: &Fcnn, tol: f32) -> Vec<LayerSparsity> {
    network
        .named_weights()
        .into_iter()
        .map(|(name, w)| LayerSparsity {
            name: name.to_string(),
            shape: w.shape(),
            zeros: w.count_near_zero(tol),
            percentage: weight_sparsity(w, tol),
        })
        .collect()
}

/// Group importance `max |w|` along `axis`, most important first.
///
/// Ties keep ascending index order.
///
/// # Example
///
/// ```
/// use sparse_fcnn::metrics::sparsity::feature_importance;
/// use sparse_fcnn::primitives::Matrix;
/// use sparse_fcnn::projection::Axis;
///
/// let w = Matrix::from_rows(&[vec![0.1, -0.9, 0.0], vec![0.3, 0.2, 0.3]]).expect("rect");
/// let ranked = feature_importance(&w, Axis::Columns);
/// assert_eq!(ranked, vec![(1, 0.9), (0, 0.3), (2, 0.3)]);
/// ```
#[must_use]
pub fn feature_importance(w: &Matrix<f32>, axis: Axis) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = group_max_abs(w, axis).into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}
