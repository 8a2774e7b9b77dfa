//! Adam optimizer over flat parameter slices.
//!
//! The network hands the optimizer one [`ParamGrad`] per parameter tensor,
//! always in the same order, so moment buffers are keyed by position.
//!
//! # References
//!
//! - Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic optimization. ICLR.

use serde::{Deserialize, Serialize};

/// A parameter tensor paired with its gradient.
#[derive(Debug)]
pub struct ParamGrad<'a> {
    /// Parameter values, updated in place.
    pub value: &'a mut [f32],
    /// Gradient of the loss w.r.t. `value`.
    pub grad: &'a [f32],
}

/// Adam optimizer.
///
/// Update rule:
/// ```text
/// m = β₁·m + (1-β₁)·g
/// v = β₂·v + (1-β₂)·g²
/// θ = θ - lr · m̂ / (√v̂ + ε)
/// ```
///
/// A coordinate whose gradient has been zero since the optimizer was created
/// keeps `m = v = 0` and is therefore never moved. The training loop relies
/// on this to keep masked weights at exactly zero in the masked phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
    t: usize,
}

impl Adam {
    /// Create a new Adam optimizer.
    ///
    /// Default: β₁=0.9, β₂=0.999, ε=1e-8
    #[must_use]
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Set beta parameters.
    #[must_use]
    pub fn betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Set epsilon for numerical stability.
    #[must_use]
    pub fn eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    /// Current learning rate.
    #[must_use]
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Number of steps taken.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.t
    }

    /// Performs one optimization step.
    pub fn step(&mut self, params: &mut [ParamGrad<'_>]) {
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for (idx, param) in params.iter_mut().enumerate() {
            if idx >= self.m.len() {
                self.m.push(vec![0.0; param.value.len()]);
                self.v.push(vec![0.0; param.value.len()]);
            }
            let m = &mut self.m[idx];
            let v = &mut self.v[idx];

            for (i, (theta, &g)) in param.value.iter_mut().zip(param.grad).enumerate() {
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;

                let m_hat = m[i] / bias_correction1;
                let v_hat = v[i] / bias_correction2;
                *theta -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
            }
        }
    }
}
