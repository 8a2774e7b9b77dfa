//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use sparse_fcnn::prelude::*;
//! ```

pub use crate::data::{BatchProvider, DataLoader, Dataset, LabelScaler};
pub use crate::error::{Result, SparseError};
pub use crate::mask::{FeatureMask, MaskSelection};
pub use crate::metrics::sparsity::{feature_importance, layer_sparsity, sparsity};
pub use crate::metrics::{mae, mse, r_squared, rmse, RegressionReport, WassersteinMode};
pub use crate::model_selection::{
    cross_validate, cross_validate_with_final_test, CvConfig, CvReport, KFold,
};
pub use crate::nn::{Activation, Fcnn, Loss, Reduction};
pub use crate::primitives::{Matrix, Vector};
pub use crate::projection::{project, Axis, ProjectionKind};
pub use crate::ranking::{FeatureScorer, RankingAccumulator, WeightMagnitudeScorer};
pub use crate::synthetic::make_regression;
pub use crate::train::{train, ProjectionSchedule, TrainConfig, TrainOutcome};
