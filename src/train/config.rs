//! Training configuration.

use crate::error::{Result, SparseError};
use crate::nn::{Activation, Loss, Reduction};
use crate::projection::{Axis, ProjectionKind};
use serde::{Deserialize, Serialize};

/// When the projection runs during the unconstrained phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSchedule {
    /// After every epoch.
    #[default]
    EveryEpoch,
    /// Once, after the last epoch.
    LastEpoch,
}

impl ProjectionSchedule {
    /// Whether zero-based `epoch` of an `n_epochs` phase ends with a projection.
    #[must_use]
    pub fn applies(self, epoch: usize, n_epochs: usize) -> bool {
        match self {
            Self::EveryEpoch => true,
            Self::LastEpoch => epoch + 1 == n_epochs,
        }
    }
}

/// Immutable configuration of one training run.
///
/// Build it from [`TrainConfig::default`] with the `with_*` methods, or parse
/// a TOML document with [`TrainConfig::from_toml_str`]; missing keys keep
/// their defaults.
///
/// # Example
///
/// ```
/// use sparse_fcnn::nn::Activation;
/// use sparse_fcnn::projection::ProjectionKind;
/// use sparse_fcnn::train::TrainConfig;
///
/// let config = TrainConfig::default()
///     .with_hidden(64)
///     .with_activation(Activation::Tanh)
///     .with_projection(ProjectionKind::BilevelL1Inf)
///     .with_eta(2.0);
/// assert!(config.validate().is_ok());
///
/// let parsed = TrainConfig::from_toml_str("eta = 0.5\nepochs_a = 10").expect("valid document");
/// assert_eq!(parsed.epochs_a, 10);
/// assert_eq!(parsed.hidden, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Hidden width of the network.
    pub hidden: usize,
    /// Activation after the input and middle layers.
    pub activation: Activation,
    /// Batch normalization after the input layer.
    pub batch_norm: bool,
    /// Projection applied to the input layer's weights.
    pub projection: ProjectionKind,
    /// Projection radius.
    pub eta: f32,
    /// Grouping of the projected weights.
    pub axis: Axis,
    /// Epochs of the unconstrained phase.
    pub epochs_a: usize,
    /// Epochs of the masked phase.
    pub epochs_b: usize,
    /// Adam learning rate.
    pub learning_rate: f32,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Weights with `|w| <= tol` count as zero.
    pub tol: f32,
    /// Run the masked phase at all.
    pub gradient_mask: bool,
    /// Regression loss.
    pub loss: Loss,
    /// Batch reduction of the loss.
    pub reduction: Reduction,
    /// When the projection runs in the unconstrained phase.
    pub schedule: ProjectionSchedule,
    /// Also project the middle layer's weights.
    pub project_middle: bool,
    /// Keep projecting after every masked-phase epoch.
    pub project_in_phase_b: bool,
    /// Reset surviving weights to their initial values before the masked phase.
    pub rewind_to_init: bool,
    /// Seed for weight initialization.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden: 300,
            activation: Activation::Silu,
            batch_norm: false,
            projection: ProjectionKind::BilevelL1Inf,
            eta: 1.0,
            axis: Axis::Columns,
            epochs_a: 30,
            epochs_b: 40,
            learning_rate: 5e-4,
            batch_size: 50,
            tol: 1e-3,
            gradient_mask: true,
            loss: Loss::Mse,
            reduction: Reduction::Sum,
            schedule: ProjectionSchedule::EveryEpoch,
            project_middle: false,
            project_in_phase_b: false,
            rewind_to_init: false,
            seed: 5,
        }
    }
}

impl TrainConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SparseError::Config`] for malformed TOML or unknown keys, and
    /// the [`TrainConfig::validate`] error for out-of-range values.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(document).map_err(|e| SparseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SparseError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SparseError::Config(e.to_string()))
    }

    /// Checks every numeric option.
    ///
    /// # Errors
    ///
    /// Returns [`SparseError::InvalidRadius`] for a bad `eta` (only when a
    /// projection is configured) and [`SparseError::InvalidHyperparameter`]
    /// for the other options.
    pub fn validate(&self) -> Result<()> {
        if self.projection.is_active() && !(self.eta.is_finite() && self.eta > 0.0) {
            return Err(SparseError::InvalidRadius { radius: self.eta });
        }
        if self.hidden == 0 {
            return Err(SparseError::invalid_hyperparameter("hidden", self.hidden, "> 0"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SparseError::invalid_hyperparameter(
                "learning_rate",
                self.learning_rate,
                "finite and > 0",
            ));
        }
        if self.batch_size == 0 {
            return Err(SparseError::invalid_hyperparameter("batch_size", 0, "> 0"));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(SparseError::invalid_hyperparameter("tol", self.tol, "finite and >= 0"));
        }
        Ok(())
    }

    /// Set the hidden width.
    #[must_use]
    pub fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the activation.
    #[must_use]
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Enable or disable batch normalization.
    #[must_use]
    pub fn with_batch_norm(mut self, batch_norm: bool) -> Self {
        self.batch_norm = batch_norm;
        self
    }

    /// Set the projection kind.
    #[must_use]
    pub fn with_projection(mut self, projection: ProjectionKind) -> Self {
        self.projection = projection;
        self
    }

    /// Set the projection radius.
    #[must_use]
    pub fn with_eta(mut self, eta: f32) -> Self {
        self.eta = eta;
        self
    }

    /// Set the projection axis.
    #[must_use]
    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Set both phase lengths.
    #[must_use]
    pub fn with_epochs(mut self, epochs_a: usize, epochs_b: usize) -> Self {
        self.epochs_a = epochs_a;
        self.epochs_b = epochs_b;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the zero tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Enable or disable the masked phase.
    #[must_use]
    pub fn with_gradient_mask(mut self, gradient_mask: bool) -> Self {
        self.gradient_mask = gradient_mask;
        self
    }

    /// Set the loss and its reduction.
    #[must_use]
    pub fn with_loss(mut self, loss: Loss, reduction: Reduction) -> Self {
        self.loss = loss;
        self.reduction = reduction;
        self
    }

    /// Set the phase-A projection schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: ProjectionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Also project the middle layer.
    #[must_use]
    pub fn with_project_middle(mut self, project_middle: bool) -> Self {
        self.project_middle = project_middle;
        self
    }

    /// Keep projecting during the masked phase.
    #[must_use]
    pub fn with_project_in_phase_b(mut self, project_in_phase_b: bool) -> Self {
        self.project_in_phase_b = project_in_phase_b;
        self
    }

    /// Rewind surviving weights to their initial values before the masked phase.
    #[must_use]
    pub fn with_rewind_to_init(mut self, rewind_to_init: bool) -> Self {
        self.rewind_to_init = rewind_to_init;
        self
    }

    /// Set the initialization seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
