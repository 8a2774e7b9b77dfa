//! Cross-validation of the two-phase sparse regressor.
//!
//! This module provides:
//! - [`KFold`]: seeded K-fold index splits
//! - [`cross_validate`]: one isolated training run per (seed, fold)
//! - [`cross_validate_with_final_test`]: the same, with every fold's network
//!   also scored on a separate final test set
//! - [`CvReport`]: per-fold metrics, failures and the merged feature ranking
//!
//! Every fold owns its network, optimizer and mask. A fold that fails (for
//! example with a divergence) is recorded in [`CvReport::failures`] and the
//! remaining folds still run. With the `parallel` feature folds run on the
//! rayon thread pool; results keep job order either way.

use crate::data::{DataLoader, Dataset, LabelScaler};
use crate::error::{Result, SparseError};
use crate::mask::{FeatureMask, MaskSelection};
use crate::metrics::sparsity::{layer_sparsity, sparsity, LayerSparsity};
use crate::metrics::{RegressionReport, WassersteinMode};
use crate::ranking::{FeatureRank, FeatureScorer, RankingAccumulator, WeightMagnitudeScorer};
use crate::train::{train, TrainConfig};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// K-Fold cross-validator.
///
/// Splits data into K consecutive folds. Each fold is used once as test set
/// while the remaining K-1 folds form the training set. The first
/// `n_samples % K` folds get one extra sample.
///
/// # Example
///
/// ```rust
/// use sparse_fcnn::model_selection::KFold;
///
/// let kfold = KFold::new(5).with_random_state(7);
///
/// for (train_idx, test_idx) in kfold.split(10) {
///     assert_eq!(train_idx.len(), 8);
///     assert_eq!(test_idx.len(), 2);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
    random_state: Option<u64>,
}

impl KFold {
    /// Create a new K-Fold cross-validator.
    ///
    /// # Arguments
    ///
    /// * `n_splits` - Number of folds. Must be at least 2.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            random_state: None,
        }
    }

    /// Shuffle indices with a seeded generator before splitting.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of folds.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test indices for each fold.
    ///
    /// Returns a vector of (train_indices, test_indices) tuples, empty when
    /// `n_splits` is 0.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        if self.n_splits == 0 {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.random_state {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut result = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let current_fold_size = if i < remainder {
                fold_size + 1
            } else {
                fold_size
            };
            let end = start + current_fold_size;

            let test_indices = indices[start..end].to_vec();
            let mut train_indices = Vec::with_capacity(n_samples - current_fold_size);
            train_indices.extend_from_slice(&indices[..start]);
            train_indices.extend_from_slice(&indices[end..]);

            result.push((train_indices, test_indices));
            start = end;
        }
        result
    }
}

/// Settings of a cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CvConfig {
    /// Folds per seed.
    pub n_folds: usize,
    /// One full K-fold pass per seed; the seed also drives fold shuffling,
    /// weight init and batch order.
    pub seeds: Vec<u64>,
    /// Divide labels by `max |y|` before training and report errors back in
    /// label units.
    pub scale_labels: bool,
    /// Input of the Wasserstein metric.
    pub wasserstein: WassersteinMode,
    /// Run folds on the rayon pool (needs the `parallel` feature).
    pub parallel: bool,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_folds: 4,
            seeds: vec![5],
            scale_labels: true,
            wasserstein: WassersteinMode::Raw,
            parallel: true,
        }
    }
}

impl CvConfig {
    /// Sets the number of folds.
    #[must_use]
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Sets the seeds.
    #[must_use]
    pub fn with_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Enables or disables label scaling.
    #[must_use]
    pub fn with_scale_labels(mut self, scale_labels: bool) -> Self {
        self.scale_labels = scale_labels;
        self
    }

    /// Sets the Wasserstein mode.
    #[must_use]
    pub fn with_wasserstein(mut self, mode: WassersteinMode) -> Self {
        self.wasserstein = mode;
        self
    }

    /// Enables or disables parallel folds.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the settings against a dataset of `n_samples` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 2 folds, more folds than
    /// samples, or no seeds.
    pub fn validate(&self, n_samples: usize) -> Result<()> {
        if self.n_folds < 2 {
            return Err(SparseError::invalid_hyperparameter(
                "n_folds",
                self.n_folds,
                ">= 2",
            ));
        }
        if self.n_folds > n_samples {
            return Err(SparseError::invalid_hyperparameter(
                "n_folds",
                self.n_folds,
                "<= number of samples",
            ));
        }
        if self.seeds.is_empty() {
            return Err(SparseError::Config("at least one seed is required".into()));
        }
        Ok(())
    }
}

/// Outcome of one successful (seed, fold) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    /// Seed of the run.
    pub seed: u64,
    /// Fold index within the seed.
    pub fold: usize,
    /// Metrics on the training rows.
    pub train: RegressionReport,
    /// Metrics on the held-out rows.
    pub test: RegressionReport,
    /// Metrics on the separate final test set, when one was given.
    pub final_test: Option<RegressionReport>,
    /// Percentage of zero groups in the input layer.
    pub group_sparsity: f64,
    /// Zero weights of every layer.
    pub layers: Vec<LayerSparsity>,
    /// Number of selected features, or the degenerate signal.
    pub selection: MaskSelection,
    /// Mask derived after phase A.
    pub mask: FeatureMask,
    /// Per-epoch loss of phase A.
    pub losses_phase_a: Vec<f64>,
    /// Per-epoch loss of phase B.
    pub losses_phase_b: Vec<f64>,
    /// Feature scores of this fold.
    pub scores: Vec<f32>,
}

impl FoldResult {
    /// Number of selected features (0 when degenerate).
    #[must_use]
    pub fn n_selected(&self) -> usize {
        self.mask.n_selected()
    }
}

/// A (seed, fold) run that stopped with an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldFailure {
    /// Seed of the run.
    pub seed: u64,
    /// Fold index within the seed.
    pub fold: usize,
    /// Why it stopped.
    pub error: SparseError,
}

/// Summary statistics of one per-fold quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldScores {
    /// Value of each successful fold.
    pub scores: Vec<f64>,
}

impl FoldScores {
    /// Mean across folds (0 when empty).
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Population standard deviation across folds (0 when empty).
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f64>()
            / self.scores.len() as f64;
        variance.sqrt()
    }

    /// Minimum value.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.scores.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Maximum value.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.scores.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Everything a cross-validation run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CvReport {
    /// Successful folds, in (seed, fold) order.
    pub folds: Vec<FoldResult>,
    /// Failed folds, in (seed, fold) order.
    pub failures: Vec<FoldFailure>,
    /// Scores of the successful folds merged per feature.
    pub ranking: Vec<FeatureRank>,
    /// Label divisor used for training.
    pub scaler: LabelScaler,
}

impl CvReport {
    /// Collects one quantity from every successful fold.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let r2 = report.scores(|f| f.test.r2);
    /// println!("R² {:.3} ± {:.3}", r2.mean(), r2.std());
    /// ```
    pub fn scores(&self, metric: impl Fn(&FoldResult) -> f64) -> FoldScores {
        FoldScores {
            scores: self.folds.iter().map(metric).collect(),
        }
    }

    /// Features ranked in the top `k` by mean score.
    #[must_use]
    pub fn top_features(&self, k: usize) -> Vec<usize> {
        self.ranking.iter().take(k).map(|r| r.feature).collect()
    }

    /// Folds whose mask selected no feature.
    #[must_use]
    pub fn degenerate_folds(&self) -> Vec<(u64, usize)> {
        self.folds
            .iter()
            .filter(|f| f.selection == MaskSelection::Degenerate)
            .map(|f| (f.seed, f.fold))
            .collect()
    }
}

struct FoldJob {
    seed: u64,
    fold: usize,
    train: Vec<usize>,
    test: Vec<usize>,
}

/// Cross-validates with [`WeightMagnitudeScorer`] as the feature ranking.
///
/// # Errors
///
/// Returns an error if either configuration is invalid. Errors inside a
/// fold are reported in [`CvReport::failures`] instead.
pub fn cross_validate(data: &Dataset, config: &TrainConfig, cv: &CvConfig) -> Result<CvReport> {
    cross_validate_with(data, config, cv, &WeightMagnitudeScorer)
}

/// Runs [`train`] on every (seed, fold) split of `data` and ranks features
/// with `scorer` on each held-out fold.
///
/// # Errors
///
/// Returns an error if either configuration is invalid. Errors inside a
/// fold are reported in [`CvReport::failures`] instead.
pub fn cross_validate_with<S>(
    data: &Dataset,
    config: &TrainConfig,
    cv: &CvConfig,
    scorer: &S,
) -> Result<CvReport>
where
    S: FeatureScorer + Sync,
{
    run_cross_validation(data, None, config, cv, scorer)
}

/// Cross-validates on `data` and also evaluates every fold's network on
/// `final_test`, a set kept out of all folds.
///
/// `final_test` labels are divided by the scaler fitted on `data`, and the
/// metrics land in [`FoldResult::final_test`].
///
/// # Errors
///
/// Returns an error if either configuration is invalid, or if `final_test`
/// is empty or has a different number of features than `data`.
pub fn cross_validate_with_final_test<S>(
    data: &Dataset,
    final_test: &Dataset,
    config: &TrainConfig,
    cv: &CvConfig,
    scorer: &S,
) -> Result<CvReport>
where
    S: FeatureScorer + Sync,
{
    if final_test.n_features() != data.n_features() {
        return Err(SparseError::dimension_mismatch(
            "final test features",
            data.n_features(),
            final_test.n_features(),
        ));
    }
    if final_test.n_samples() == 0 {
        return Err(SparseError::empty_input("final test set"));
    }
    run_cross_validation(data, Some(final_test), config, cv, scorer)
}

fn run_cross_validation<S>(
    data: &Dataset,
    final_test: Option<&Dataset>,
    config: &TrainConfig,
    cv: &CvConfig,
    scorer: &S,
) -> Result<CvReport>
where
    S: FeatureScorer + Sync,
{
    config.validate()?;
    cv.validate(data.n_samples())?;

    let scaler = if cv.scale_labels {
        LabelScaler::fit(data.y())
    } else {
        LabelScaler::identity()
    };
    let scaled = data.scaled(&scaler);
    let final_test = final_test.map(|set| set.scaled(&scaler));

    let jobs: Vec<FoldJob> = cv
        .seeds
        .iter()
        .flat_map(|&seed| {
            KFold::new(cv.n_folds)
                .with_random_state(seed)
                .split(scaled.n_samples())
                .into_iter()
                .enumerate()
                .map(move |(fold, (train, test))| FoldJob {
                    seed,
                    fold,
                    train,
                    test,
                })
        })
        .collect();
    info!(
        jobs = jobs.len(),
        folds = cv.n_folds,
        seeds = cv.seeds.len(),
        scorer = scorer.name(),
        "cross-validation started"
    );

    let run = |job: &FoldJob| {
        run_fold(&scaled, final_test.as_ref(), config, cv, &scaler, scorer, job)
    };
    #[cfg(feature = "parallel")]
    let outcomes: Vec<Result<FoldResult>> = if cv.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Result<FoldResult>> = jobs.iter().map(run).collect();

    let mut ranking = RankingAccumulator::new(data.n_features());
    let mut folds = Vec::new();
    let mut failures = Vec::new();
    for (job, outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Ok(result) => {
                ranking.add(
                    format!("{}_seed{}_fold{}", scorer.name(), job.seed, job.fold),
                    result.scores.clone(),
                )?;
                folds.push(result);
            }
            Err(error) => {
                warn!(seed = job.seed, fold = job.fold, %error, "fold failed");
                failures.push(FoldFailure {
                    seed: job.seed,
                    fold: job.fold,
                    error,
                });
            }
        }
    }
    info!(
        succeeded = folds.len(),
        failed = failures.len(),
        "cross-validation finished"
    );

    Ok(CvReport {
        folds,
        failures,
        ranking: ranking.finalize(),
        scaler,
    })
}

fn run_fold<S: FeatureScorer>(
    data: &Dataset,
    final_test: Option<&Dataset>,
    config: &TrainConfig,
    cv: &CvConfig,
    scaler: &LabelScaler,
    scorer: &S,
    job: &FoldJob,
) -> Result<FoldResult> {
    info!(seed = job.seed, fold = job.fold, "fold started");
    let train_set = data.subset(&job.train);
    let test_set = data.subset(&job.test);

    let fold_config = config.clone().with_seed(job.seed);
    let mut loader = DataLoader::new(
        &train_set,
        fold_config.batch_size,
        job.seed.wrapping_add(job.fold as u64),
    )?;
    let outcome = train(&mut loader, &fold_config)?;

    let network = &outcome.network;
    let train_report = RegressionReport::evaluate(
        &network.predict(train_set.x())?,
        train_set.y(),
        scaler,
        cv.wasserstein,
    )?;
    let test_report = RegressionReport::evaluate(
        &network.predict(test_set.x())?,
        test_set.y(),
        scaler,
        cv.wasserstein,
    )?;
    let final_report = final_test
        .map(|set| {
            RegressionReport::evaluate(
                &network.predict(set.x())?,
                set.y(),
                scaler,
                cv.wasserstein,
            )
        })
        .transpose()?;
    let scores = scorer.score(network, &test_set, fold_config.tol)?;

    let result = FoldResult {
        seed: job.seed,
        fold: job.fold,
        train: train_report,
        test: test_report,
        final_test: final_report,
        group_sparsity: sparsity(network.input_weight(), fold_config.tol, fold_config.axis),
        layers: layer_sparsity(network, fold_config.tol),
        selection: outcome.selection(),
        mask: outcome.mask.clone(),
        losses_phase_a: outcome.losses_phase_a.clone(),
        losses_phase_b: outcome.losses_phase_b.clone(),
        scores,
    };
    info!(
        seed = job.seed,
        fold = job.fold,
        selected = result.n_selected(),
        test_rmse = result.test.rmse,
        test_r2 = result.test.r2,
        "fold finished"
    );
    Ok(result)
}

#[cfg(test)]
#[path = "tests_kfold_contract.rs"]
mod tests_kfold_contract;
