//! The fully connected regressor trained with embedded feature selection.

use super::activation::Activation;
use super::linear::Linear;
use super::normalization::BatchNorm1d;
use super::optim::ParamGrad;
use crate::error::{Result, SparseError};
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Dense layers of [`Fcnn`], addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    /// `n_features → hidden`; its columns are the input features.
    Input,
    /// `hidden → hidden`.
    Middle,
    /// `hidden → 1`.
    Output,
}

impl LayerId {
    /// Every dense layer, input first.
    pub const ALL: [Self; 3] = [Self::Input, Self::Middle, Self::Output];

    /// Weight name used in sparsity reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "encoder.0.weight",
            Self::Middle => "encoder.3.weight",
            Self::Output => "encoder.5.weight",
        }
    }

    /// Parameter prefix of the layer in a state dict.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Input => "encoder.0",
            Self::Middle => "encoder.3",
            Self::Output => "encoder.5",
        }
    }
}

/// Fully connected network:
///
/// ```text
/// Linear(n_features, hidden) → [BatchNorm1d] → act
///   → Linear(hidden, hidden) → act
///   → Linear(hidden, 1)
/// ```
///
/// The backward pass is written out by hand; [`Fcnn::forward`] caches the
/// pre-activations it needs.
///
/// # Example
///
/// ```
/// use sparse_fcnn::nn::{Activation, Fcnn};
/// use sparse_fcnn::primitives::Matrix;
///
/// let net = Fcnn::new(8, 16, Activation::Tanh, false, 42).expect("non-zero sizes");
/// let y = net.predict(&Matrix::zeros(4, 8)).expect("8 columns");
/// assert_eq!(y.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fcnn {
    input: Linear,
    norm: Option<BatchNorm1d>,
    middle: Linear,
    output: Linear,
    activation: Activation,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

#[derive(Debug, Clone, PartialEq)]
struct ForwardCache {
    /// First pre-activation (after normalization when enabled)
    z1: Matrix<f32>,
    /// Second pre-activation
    z2: Matrix<f32>,
}

impl Fcnn {
    /// Builds a freshly initialized network from `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_features` or `hidden` is zero.
    pub fn new(
        n_features: usize,
        hidden: usize,
        activation: Activation,
        batch_norm: bool,
        seed: u64,
    ) -> Result<Self> {
        if n_features == 0 {
            return Err(SparseError::empty_input("network input features"));
        }
        if hidden == 0 {
            return Err(SparseError::invalid_hyperparameter("hidden", hidden, "> 0"));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        Ok(Self {
            input: Linear::new(n_features, hidden, &mut rng),
            norm: batch_norm.then(|| BatchNorm1d::new(hidden)),
            middle: Linear::new(hidden, hidden, &mut rng),
            output: Linear::new(hidden, 1, &mut rng),
            activation,
            cache: None,
        })
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.input.in_features()
    }

    /// Hidden width.
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.input.out_features()
    }

    /// Activation used after the input and middle layers.
    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Whether the batch normalization layer is present.
    #[must_use]
    pub fn has_batch_norm(&self) -> bool {
        self.norm.is_some()
    }

    /// Dense layer by id.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> &Linear {
        match id {
            LayerId::Input => &self.input,
            LayerId::Middle => &self.middle,
            LayerId::Output => &self.output,
        }
    }

    /// Mutable dense layer by id.
    pub fn layer_mut(&mut self, id: LayerId) -> &mut Linear {
        match id {
            LayerId::Input => &mut self.input,
            LayerId::Middle => &mut self.middle,
            LayerId::Output => &mut self.output,
        }
    }

    /// Normalization layer, if enabled.
    pub(super) fn norm(&self) -> Option<&BatchNorm1d> {
        self.norm.as_ref()
    }

    pub(super) fn norm_mut(&mut self) -> Option<&mut BatchNorm1d> {
        self.norm.as_mut()
    }

    /// Weight matrix of the input layer, `[hidden, n_features]`.
    #[must_use]
    pub fn input_weight(&self) -> &Matrix<f32> {
        self.input.weight()
    }

    /// Mutable weight matrix of the input layer.
    pub fn input_weight_mut(&mut self) -> &mut Matrix<f32> {
        self.input.weight_mut()
    }

    /// Every dense weight matrix with its report name.
    #[must_use]
    pub fn named_weights(&self) -> Vec<(&'static str, &Matrix<f32>)> {
        LayerId::ALL
            .iter()
            .map(|&id| (id.name(), self.layer(id).weight()))
            .collect()
    }

    /// Training forward pass; returns the `(batch, 1)` prediction and
    /// caches what [`Fcnn::backward`] needs.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` doesn't have `n_features` columns.
    pub fn forward(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mut z1 = self.input.forward(x)?;
        if let Some(norm) = self.norm.as_mut() {
            z1 = norm.forward(&z1)?;
        }
        let h1 = self.activation.forward(&z1);
        let z2 = self.middle.forward(&h1)?;
        let h2 = self.activation.forward(&z2);
        let out = self.output.forward(&h2)?;
        self.cache = Some(ForwardCache { z1, z2 });
        Ok(out)
    }

    /// Evaluation forward pass, one prediction per row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` doesn't have `n_features` columns.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        let mut z1 = self.input.predict(x)?;
        if let Some(norm) = self.norm.as_ref() {
            z1 = norm.predict(&z1)?;
        }
        let h1 = self.activation.forward(&z1);
        let h2 = self.activation.forward(&self.middle.predict(&h1)?);
        let out = self.output.predict(&h2)?;
        Ok(Vector::from_slice(out.as_slice()))
    }

    /// Backpropagates `dL/d(output)` and stores every parameter gradient.
    ///
    /// # Errors
    ///
    /// Returns an error if no forward pass preceded this call or the
    /// gradient shape differs from the last output.
    pub fn backward(&mut self, grad_out: &Matrix<f32>) -> Result<()> {
        let cache = self.cache.take().ok_or_else(|| {
            SparseError::InvalidState("network backward called before forward".to_string())
        })?;
        let g_h2 = self.output.backward(grad_out)?;
        let g_z2 = self.activation.backward(&cache.z2, &g_h2);
        let g_h1 = self.middle.backward(&g_z2)?;
        let mut g_z1 = self.activation.backward(&cache.z1, &g_h1);
        if let Some(norm) = self.norm.as_mut() {
            g_z1 = norm.backward(&g_z1)?;
        }
        self.input.backward(&g_z1)?;
        Ok(())
    }

    /// Mutable input-layer weight gradient, gated by the feature mask.
    pub fn input_grad_mut(&mut self) -> &mut Matrix<f32> {
        self.input.grad_weight_mut()
    }

    /// Every parameter with its gradient, in a fixed order.
    pub fn parameters(&mut self) -> Vec<ParamGrad<'_>> {
        let mut params: Vec<ParamGrad<'_>> = Vec::with_capacity(8);
        params.extend(self.input.params_mut());
        if let Some(norm) = self.norm.as_mut() {
            params.extend(norm.params_mut());
        }
        params.extend(self.middle.params_mut());
        params.extend(self.output.params_mut());
        params
    }
}
