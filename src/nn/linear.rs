//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xWᵀ + b with an explicit backward
//! pass. The weight keeps the `[out_features, in_features]` layout, so for
//! the input layer column `j` holds every weight attached to feature `j`.

use super::init::{fan_in_bound, uniform};
use super::optim::ParamGrad;
use crate::error::{Result, SparseError};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Fully connected layer: y = xWᵀ + b
///
/// # Shape
///
/// - Input: `(batch, in_features)`
/// - Output: `(batch, out_features)`
///
/// # Example
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use sparse_fcnn::nn::Linear;
/// use sparse_fcnn::primitives::Matrix;
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let mut layer = Linear::new(20, 30, &mut rng);
/// let x = Matrix::ones(128, 20);
/// let y = layer.forward(&x).expect("20 input columns");
/// assert_eq!(y.shape(), (128, 30));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Matrix<f32>,
    /// Bias vector, length out_features
    bias: Vec<f32>,
    grad_weight: Matrix<f32>,
    grad_bias: Vec<f32>,
    /// Input of the last training forward pass
    #[serde(skip)]
    input: Option<Matrix<f32>>,
}

impl Linear {
    /// Creates a layer with weights and biases drawn from
    /// U(-1/√in, 1/√in).
    #[must_use]
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let bound = fan_in_bound(in_features);
        let weight = uniform(out_features, in_features, bound, rng);
        let bias = uniform(1, out_features, bound, rng).as_slice().to_vec();
        Self::from_parts(weight, bias)
    }

    /// Creates a layer from explicit parameters.
    ///
    /// # Panics
    ///
    /// Panics if `bias.len()` differs from the weight's row count.
    #[must_use]
    pub fn from_parts(weight: Matrix<f32>, bias: Vec<f32>) -> Self {
        assert_eq!(bias.len(), weight.n_rows(), "one bias per output");
        let (rows, cols) = weight.shape();
        Self {
            grad_weight: Matrix::zeros(rows, cols),
            grad_bias: vec![0.0; rows],
            weight,
            bias,
            input: None,
        }
    }

    /// Number of input features.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.weight.n_cols()
    }

    /// Number of output features.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.weight.n_rows()
    }

    /// Weight matrix.
    #[must_use]
    pub fn weight(&self) -> &Matrix<f32> {
        &self.weight
    }

    /// Mutable weight matrix (projection and masking write here).
    pub fn weight_mut(&mut self) -> &mut Matrix<f32> {
        &mut self.weight
    }

    /// Bias vector.
    #[must_use]
    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Named parameter tensors with their shapes.
    pub(super) fn tensors(&self) -> [(&'static str, &[f32], Vec<usize>); 2] {
        let (rows, cols) = self.weight.shape();
        [
            ("weight", self.weight.as_slice(), vec![rows, cols]),
            ("bias", self.bias.as_slice(), vec![rows]),
        ]
    }

    /// Mutable views of [`Linear::tensors`], same order.
    pub(super) fn tensors_mut(&mut self) -> [&mut [f32]; 2] {
        [self.weight.as_mut_slice(), self.bias.as_mut_slice()]
    }

    /// Weight gradient of the last backward pass.
    #[must_use]
    pub fn grad_weight(&self) -> &Matrix<f32> {
        &self.grad_weight
    }

    /// Mutable weight gradient (the feature mask gates it here).
    pub fn grad_weight_mut(&mut self) -> &mut Matrix<f32> {
        &mut self.grad_weight
    }

    /// Training forward pass; caches `x` for [`Linear::backward`].
    ///
    /// # Errors
    ///
    /// Returns an error if `x` doesn't have `in_features` columns.
    pub fn forward(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let out = self.predict(x)?;
        self.input = Some(x.clone());
        Ok(out)
    }

    /// Forward pass without caching.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` doesn't have `in_features` columns.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mut out = x.matmul_transposed(&self.weight)?;
        for r in 0..out.n_rows() {
            for (y, b) in out.row_slice_mut(r).iter_mut().zip(&self.bias) {
                *y += b;
            }
        }
        Ok(out)
    }

    /// Backward pass: stores `dL/dW = gᵀx`, `dL/db = Σ_rows g` and returns
    /// `dL/dx = gW`.
    ///
    /// # Errors
    ///
    /// Returns an error if no forward pass preceded this call or the
    /// gradient shape doesn't match the last output.
    pub fn backward(&mut self, grad_out: &Matrix<f32>) -> Result<Matrix<f32>> {
        let input = self.input.as_ref().ok_or_else(|| {
            SparseError::InvalidState("linear backward called before forward".to_string())
        })?;
        let expected = (input.n_rows(), self.out_features());
        if grad_out.shape() != expected {
            return Err(SparseError::shape_mismatch(expected, grad_out.shape()));
        }

        self.grad_weight = grad_out.transpose_matmul(input)?;
        self.grad_bias.fill(0.0);
        for r in 0..grad_out.n_rows() {
            for (gb, &g) in self.grad_bias.iter_mut().zip(grad_out.row_slice(r)) {
                *gb += g;
            }
        }
        grad_out.matmul(&self.weight)
    }

    /// Parameters paired with their gradients: weight, then bias.
    pub fn params_mut(&mut self) -> [ParamGrad<'_>; 2] {
        [
            ParamGrad {
                value: self.weight.as_mut_slice(),
                grad: self.grad_weight.as_slice(),
            },
            ParamGrad {
                value: &mut self.bias,
                grad: &self.grad_bias,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn layer() -> Linear {
        let w = Matrix::from_rows(&[vec![1.0, 2.0, 0.0], vec![0.0, -1.0, 3.0]]).expect("rect");
        Linear::from_parts(w, vec![0.5, -0.5])
    }

    #[test]
    fn test_forward_adds_bias() {
        let mut l = layer();
        let x = Matrix::from_rows(&[vec![1.0, 1.0, 1.0], vec![2.0, 0.0, -1.0]]).expect("rect");
        let y = l.forward(&x).expect("3 columns");
        assert_eq!(y.as_slice(), &[3.5, 1.5, 2.5, -3.5]);
    }

    #[test]
    fn test_backward_gradients() {
        let mut l = layer();
        let x = Matrix::from_rows(&[vec![1.0, 1.0, 1.0], vec![2.0, 0.0, -1.0]]).expect("rect");
        l.forward(&x).expect("3 columns");
        let g = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 2.0]]).expect("rect");
        let dx = l.backward(&g).expect("matching shape");

        // dW = gᵀx
        assert_eq!(
            l.grad_weight().as_slice(),
            &[1.0, 1.0, 1.0, 4.0, 0.0, -2.0]
        );
        assert_eq!(l.grad_bias, vec![1.0, 2.0]);
        // dx = gW
        assert_eq!(dx.as_slice(), &[1.0, 2.0, 0.0, 0.0, -2.0, 6.0]);
    }

    #[test]
    fn test_backward_without_forward_fails() {
        let mut l = layer();
        let g = Matrix::ones(1, 2);
        assert!(matches!(
            l.backward(&g),
            Err(SparseError::InvalidState(_))
        ));
    }

    #[test]
    fn test_wrong_input_width_fails() {
        let mut l = layer();
        assert!(l.forward(&Matrix::ones(4, 2)).is_err());
    }

    #[test]
    fn test_new_is_seeded() {
        let a = Linear::new(5, 3, &mut StdRng::seed_from_u64(11));
        let b = Linear::new(5, 3, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
        assert_eq!(a.in_features(), 5);
        assert_eq!(a.out_features(), 3);
        let bound = 1.0 / 5.0_f32.sqrt();
        assert!(a.weight().as_slice().iter().all(|w| w.abs() <= bound));
    }
}
