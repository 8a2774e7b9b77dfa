//! sparse-fcnn: fully connected regression networks with embedded feature
//! selection.
//!
//! A small network is trained in two phases. Phase A runs plain Adam
//! descent and projects the input-layer weights onto a bilevel l1,∞ ball
//! after every epoch, which zeroes whole feature columns. The surviving
//! columns define a [`FeatureMask`]; phase B keeps training with the
//! gradients of dropped features gated to zero, so they never regrow.
//!
//! # Quick Start
//!
//! ```
//! use sparse_fcnn::prelude::*;
//!
//! let synth = make_regression(80, 20, 3, 0.05, 1).expect("valid sizes");
//! let scaler = LabelScaler::fit(synth.dataset.y());
//! let data = synth.dataset.scaled(&scaler);
//!
//! let config = TrainConfig::default()
//!     .with_hidden(16)
//!     .with_activation(Activation::Tanh)
//!     .with_epochs(5, 5)
//!     .with_batch_size(20)
//!     .with_eta(0.5);
//!
//! let mut loader = DataLoader::new(&data, config.batch_size, 7).expect("batch size > 0");
//! let outcome = train(&mut loader, &config).expect("finite training");
//!
//! assert_eq!(outcome.losses_phase_a.len(), 5);
//! assert!(outcome.mask.is_respected_by(outcome.network.input_weight()));
//! println!("selected features: {:?}", outcome.selected_features());
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`projection`]: l1, l1,1, l2,1, l1,∞ and bilevel l1,∞ ball projections
//! - [`mask`]: Feature masks derived from projected weights
//! - [`nn`]: Layers, activations, losses and Adam for the regressor
//! - [`data`]: Datasets, shuffled mini-batches and label scaling
//! - [`train`]: The two-phase training loop and its configuration
//! - [`metrics`]: Regression metrics and weight sparsity
//! - [`ranking`]: Per-feature scores and their merge across folds
//! - [`model_selection`]: K-fold cross-validation of the whole pipeline
//! - [`synthetic`]: Seeded regression data with known informative features

pub mod data;
pub mod error;
pub mod mask;
pub mod metrics;
pub mod model_selection;
pub mod nn;
pub mod prelude;
pub mod primitives;
pub mod projection;
pub mod ranking;
pub mod synthetic;
pub mod train;

pub use error::{Result, SparseError};
pub use mask::FeatureMask;
pub use primitives::{Matrix, Vector};
pub use projection::{project, Axis, ProjectionKind};
