//! Element-wise activation functions with their derivatives.
//!
//! Every activation is applied to a pre-activation matrix `z` and keeps
//! nothing in memory; the network caches `z` itself and asks for
//! `f'(z)` during the backward pass.

use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// √(2/π), used by the tanh form of GELU.
const SQRT_2_OVER_PI: f32 = 0.797_884_6;
const GELU_COEFF: f32 = 0.044_715;

/// Activation applied after the input and middle layers.
///
/// # Example
///
/// ```
/// use sparse_fcnn::nn::Activation;
///
/// assert_eq!(Activation::Relu.apply(-2.0), 0.0);
/// assert!((Activation::Tanh.derivative(0.0) - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Hyperbolic tangent.
    Tanh,
    /// Gaussian Error Linear Unit, tanh approximation (Hendrycks & Gimpel, 2016).
    Gelu,
    /// Rectified Linear Unit.
    Relu,
    /// Sigmoid Linear Unit, `x·σ(x)` (Elfwing et al., 2018).
    #[default]
    Silu,
}

impl Activation {
    /// `f(x)`.
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::Gelu => 0.5 * x * (1.0 + gelu_inner(x).tanh()),
            Self::Relu => x.max(0.0),
            Self::Silu => x * sigmoid(x),
        }
    }

    /// `f'(x)`, evaluated at the pre-activation.
    #[must_use]
    pub fn derivative(self, x: f32) -> f32 {
        match self {
            Self::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Self::Gelu => {
                let t = gelu_inner(x).tanh();
                let d_inner = SQRT_2_OVER_PI * (1.0 + 3.0 * GELU_COEFF * x * x);
                0.5 * (1.0 + t) + 0.5 * x * (1.0 - t * t) * d_inner
            }
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Silu => {
                let s = sigmoid(x);
                s * (1.0 + x * (1.0 - s))
            }
        }
    }

    /// Applies the activation to every entry.
    #[must_use]
    pub fn forward(self, z: &Matrix<f32>) -> Matrix<f32> {
        z.map(|x| self.apply(x))
    }

    /// Chain rule through the activation: `grad_out ⊙ f'(z)`.
    ///
    /// `z` and `grad_out` have the same shape (the network guarantees it).
    #[must_use]
    pub fn backward(self, z: &Matrix<f32>, grad_out: &Matrix<f32>) -> Matrix<f32> {
        let mut grad = grad_out.clone();
        for (g, &x) in grad.as_mut_slice().iter_mut().zip(z.as_slice()) {
            *g *= self.derivative(x);
        }
        grad
    }

    /// Lower-case name, as accepted in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tanh => "tanh",
            Self::Gelu => "gelu",
            Self::Relu => "relu",
            Self::Silu => "silu",
        }
    }
}

fn gelu_inner(x: f32) -> f32 {
    SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x)
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
