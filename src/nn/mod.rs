//! Neural network building blocks for the sparse regressor.
//!
//! The network is small and fixed, so every layer carries its own explicit
//! backward pass instead of going through a tape:
//!
//! - **Layers**: [`Linear`], [`BatchNorm1d`]
//! - **Activations**: [`Activation`] (tanh, GELU, ReLU, SiLU)
//! - **Network**: [`Fcnn`], three dense layers with optional normalization
//! - **Losses**: [`Loss`] (squared error, smooth L1) with [`Reduction`]
//! - **Optimizer**: [`Adam`]
//! - **Snapshots**: [`serialize`] (named state dicts, JSON)
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::nn::{Activation, Adam, Fcnn, Loss, Reduction};
//! use sparse_fcnn::primitives::{Matrix, Vector};
//!
//! let mut net = Fcnn::new(4, 8, Activation::Silu, false, 5).expect("non-zero sizes");
//! let mut opt = Adam::new(1e-3);
//! let x = Matrix::ones(2, 4);
//! let y = Vector::from_slice(&[1.0, 0.0]);
//!
//! let pred = net.forward(&x).expect("4 columns");
//! let (_, grad) = Loss::Mse.evaluate(&pred, &y, Reduction::Sum).expect("2 rows");
//! net.backward(&grad).expect("after forward");
//! opt.step(&mut net.parameters());
//! ```
//!
//! # References
//!
//! - He, K., et al. (2015). Delving deep into rectifiers. ICCV.

mod activation;
pub mod init;
mod linear;
mod loss;
mod network;
mod normalization;
mod optim;
pub mod serialize;

pub use activation::Activation;
pub use linear::Linear;
pub use loss::{Loss, Reduction};
pub use network::{Fcnn, LayerId};
pub use normalization::BatchNorm1d;
pub use optim::{Adam, ParamGrad};
