//! Two-phase training with embedded feature selection.
//!
//! ```text
//!   Phase A: unconstrained descent          Phase B: masked descent
//!   ┌──────────────────────────────┐        ┌───────────────────────────────┐
//!   │ forward → loss → backward    │  mask  │ forward → loss → backward     │
//!   │ → Adam step                  │ ─────▶ │ → zero masked gradients       │
//!   │ end of epoch: project W₁     │        │ → Adam step                   │
//!   └──────────────────────────────┘        └───────────────────────────────┘
//! ```
//!
//! Phase A runs a fixed number of epochs and projects the input layer's
//! weights onto the configured ball. The surviving groups
//! (`group max > tol`) form the [`FeatureMask`], fixed for the rest of the
//! run. Phase B trains with a fresh optimizer while every gradient of a
//! dropped group is zeroed before the update, so dropped weights stay
//! exactly zero.
//!
//! Epoch losses are per-sample means: batch losses are brought to a
//! per-sample sum (a `Mean` batch loss is weighted by its batch length),
//! summed in `f64` and divided by the number of samples of the epoch, so
//! both reductions give the same trajectory. A non-finite batch loss stops the run with
//! [`SparseError::Divergence`].

mod config;

pub use config::{ProjectionSchedule, TrainConfig};

use crate::data::BatchProvider;
use crate::error::{Result, SparseError};
use crate::mask::{FeatureMask, MaskSelection};
use crate::nn::{Adam, Fcnn, LayerId, Reduction};
use crate::projection::group_max_abs;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Training phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Unconstrained descent with periodic projection.
    A,
    /// Descent with masked gradients.
    B,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Final network parameters.
    pub network: Fcnn,
    /// Mean per-sample loss of every phase-A epoch.
    pub losses_phase_a: Vec<f64>,
    /// Mean per-sample loss of every phase-B epoch.
    pub losses_phase_b: Vec<f64>,
    /// Mask derived after phase A.
    pub mask: FeatureMask,
}

impl TrainOutcome {
    /// Selection signal of the mask; `Degenerate` when nothing survived.
    #[must_use]
    pub fn selection(&self) -> MaskSelection {
        self.mask.selection()
    }

    /// Indices of the selected input groups.
    #[must_use]
    pub fn selected_features(&self) -> Vec<usize> {
        self.mask.selected_indices()
    }
}

/// Trains a freshly initialized network on `data`.
///
/// The network is built from `config.seed`; the batch order is whatever
/// `data` yields (a [`DataLoader`](crate::data::DataLoader) reshuffles from
/// its own seed).
///
/// Batches come from `data` as they are: `config.batch_size` is only the
/// size callers should build their provider with. A provider whose
/// [`BatchProvider::batch_size`] differs is used anyway, with a warning.
///
/// # Errors
///
/// Returns the configuration error of [`TrainConfig::validate`], a
/// dimension mismatch between batches and the network, or
/// [`SparseError::Divergence`] when a loss becomes non-finite.
///
/// # Example
///
/// ```
/// use sparse_fcnn::data::{DataLoader, Dataset};
/// use sparse_fcnn::primitives::{Matrix, Vector};
/// use sparse_fcnn::train::{train, TrainConfig};
///
/// let x = Matrix::from_vec(4, 3, vec![
///     1.0, 0.0, 0.5,
///     0.0, 1.0, 0.5,
///     1.0, 1.0, 0.5,
///     0.0, 0.0, 0.5,
/// ]).expect("4x3");
/// let y = Vector::from_slice(&[1.0, 0.0, 1.0, 0.0]);
/// let data = Dataset::new(x, y).expect("valid data");
/// let mut loader = DataLoader::new(&data, 2, 0).expect("batch size > 0");
///
/// let config = TrainConfig::default()
///     .with_hidden(8)
///     .with_epochs(3, 2)
///     .with_batch_size(2)
///     .with_eta(0.5);
/// let outcome = train(&mut loader, &config).expect("finite training");
/// assert_eq!(outcome.losses_phase_a.len(), 3);
/// assert_eq!(outcome.losses_phase_b.len(), 2);
/// assert!(outcome.mask.is_respected_by(outcome.network.input_weight()));
/// ```
pub fn train<P: BatchProvider>(data: &mut P, config: &TrainConfig) -> Result<TrainOutcome> {
    if let Some(provided) = data.batch_size() {
        if provided != config.batch_size {
            warn!(
                provided,
                configured = config.batch_size,
                "provider batch size differs from the configuration; using the provider's"
            );
        }
    }
    TrainingLoop::new(config, data.n_features())?.run(data)
}

/// The two-phase state machine around one network.
///
/// [`train`] covers the common case; use the loop directly to start from an
/// existing network.
#[derive(Debug, Clone)]
pub struct TrainingLoop<'c> {
    config: &'c TrainConfig,
    network: Fcnn,
    initial: Option<Fcnn>,
}

impl<'c> TrainingLoop<'c> {
    /// Validates `config` and initializes a network for `n_features` inputs.
    ///
    /// # Errors
    ///
    /// Returns the error of [`TrainConfig::validate`] or of [`Fcnn::new`].
    pub fn new(config: &'c TrainConfig, n_features: usize) -> Result<Self> {
        config.validate()?;
        let network = Fcnn::new(
            n_features,
            config.hidden,
            config.activation,
            config.batch_norm,
            config.seed,
        )?;
        Ok(Self::with_network(config, network))
    }

    /// Starts from an existing network.
    #[must_use]
    pub fn with_network(config: &'c TrainConfig, network: Fcnn) -> Self {
        let initial = config.rewind_to_init.then(|| network.clone());
        Self {
            config,
            network,
            initial,
        }
    }

    /// Network in its current state.
    #[must_use]
    pub fn network(&self) -> &Fcnn {
        &self.network
    }

    /// Runs both phases and returns the trained network.
    ///
    /// # Errors
    ///
    /// See [`train`].
    pub fn run<P: BatchProvider>(mut self, data: &mut P) -> Result<TrainOutcome> {
        if data.n_features() != self.network.n_features() {
            return Err(SparseError::dimension_mismatch(
                "batch features",
                self.network.n_features(),
                data.n_features(),
            ));
        }
        if data.n_samples() == 0 {
            return Err(SparseError::empty_input("training batches"));
        }

        let losses_phase_a = self.run_phase_a(data)?;
        let mask = self.derive_mask()?;
        let losses_phase_b = if self.config.gradient_mask {
            self.run_phase_b(data, &mask)?
        } else {
            info!("masked phase disabled");
            Vec::new()
        };

        Ok(TrainOutcome {
            network: self.network,
            losses_phase_a,
            losses_phase_b,
            mask,
        })
    }

    /// Unconstrained descent with the configured projection schedule.
    ///
    /// # Errors
    ///
    /// See [`train`].
    pub fn run_phase_a<P: BatchProvider>(&mut self, data: &mut P) -> Result<Vec<f64>> {
        let n_epochs = self.config.epochs_a;
        info!(
            epochs = n_epochs,
            projection = self.config.projection.name(),
            eta = self.config.eta,
            "phase A: unconstrained descent"
        );

        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut losses = Vec::with_capacity(n_epochs);
        for epoch in 0..n_epochs {
            let loss = self.run_epoch(data, &mut optimizer, Phase::A, epoch, None)?;
            losses.push(loss);
            if self.config.projection.is_active() && self.config.schedule.applies(epoch, n_epochs) {
                self.project_layers(Phase::A, epoch)?;
            }
        }
        Ok(losses)
    }

    /// Derives the mask from the current input-layer weights.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are non-finite.
    pub fn derive_mask(&self) -> Result<FeatureMask> {
        let mask = FeatureMask::from_weights(
            self.network.input_weight(),
            self.config.axis,
            self.config.tol,
        )?;
        match mask.selection() {
            MaskSelection::Degenerate => warn!(
                groups = mask.len(),
                "0 features selected: input layer is frozen at zero"
            ),
            MaskSelection::Features(n) => {
                info!(selected = n, dropped = mask.n_dropped(), "feature mask derived");
            }
        }
        Ok(mask)
    }

    /// Masked descent: gradients of dropped groups are zeroed before every
    /// optimizer step.
    ///
    /// # Errors
    ///
    /// See [`train`].
    pub fn run_phase_b<P: BatchProvider>(
        &mut self,
        data: &mut P,
        mask: &FeatureMask,
    ) -> Result<Vec<f64>> {
        let n_epochs = self.config.epochs_b;
        info!(epochs = n_epochs, "phase B: masked descent");

        if let Some(initial) = self.initial.take() {
            debug!("rewinding surviving weights to their initial values");
            self.network = initial;
        }
        mask.mask_weights(self.network.input_weight_mut())?;

        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut losses = Vec::with_capacity(n_epochs);
        for epoch in 0..n_epochs {
            let loss = self.run_epoch(data, &mut optimizer, Phase::B, epoch, Some(mask))?;
            losses.push(loss);
            if self.config.project_in_phase_b && self.config.projection.is_active() {
                self.project_layers(Phase::B, epoch)?;
            }
        }
        Ok(losses)
    }

    fn run_epoch<P: BatchProvider>(
        &mut self,
        data: &mut P,
        optimizer: &mut Adam,
        phase: Phase,
        epoch: usize,
        mask: Option<&FeatureMask>,
    ) -> Result<f64> {
        let mut total = 0.0_f64;
        let mut seen = 0_usize;
        for batch in data.epoch() {
            let pred = self.network.forward(&batch.x)?;
            let (loss, grad) = self
                .config
                .loss
                .evaluate(&pred, &batch.y, self.config.reduction)?;
            if !loss.is_finite() {
                warn!(%phase, epoch, loss, "non-finite loss");
                return Err(SparseError::Divergence {
                    phase: phase.to_string(),
                    epoch,
                    loss,
                });
            }
            total += match self.config.reduction {
                Reduction::Sum => loss,
                Reduction::Mean => loss * batch.len() as f64,
            };
            seen += batch.len();

            self.network.backward(&grad)?;
            if let Some(mask) = mask {
                mask.mask_gradient(self.network.input_grad_mut())?;
            }
            optimizer.step(&mut self.network.parameters());
        }

        let mean = total / seen.max(1) as f64;
        debug!(%phase, epoch, loss = mean, "epoch finished");
        Ok(mean)
    }

    fn project_layers(&mut self, phase: Phase, epoch: usize) -> Result<()> {
        let layers: &[LayerId] = if self.config.project_middle {
            &[LayerId::Input, LayerId::Middle]
        } else {
            &[LayerId::Input]
        };
        for &id in layers {
            let w = self.network.layer(id).weight();
            if !w.is_finite() {
                return Err(SparseError::Divergence {
                    phase: phase.to_string(),
                    epoch,
                    loss: f64::NAN,
                });
            }
            let projected =
                self.config
                    .projection
                    .project(w, self.config.eta, self.config.axis)?;
            let zeroed = group_max_abs(&projected, self.config.axis)
                .iter()
                .filter(|&&m| m <= self.config.tol)
                .count();
            debug!(
                %phase,
                epoch,
                layer = id.name(),
                zeroed_groups = zeroed,
                groups = self.config.axis.n_groups(&projected),
                "projected"
            );
            *self.network.layer_mut(id).weight_mut() = projected;
        }
        Ok(())
    }
}
