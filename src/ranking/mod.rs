//! Per-feature importance scores and their merge across folds.
//!
//! A [`FeatureScorer`] turns a trained network into one score per input
//! feature. Attribution methods that need a framework of their own plug in
//! through this trait; two scorers are built in:
//!
//! - [`WeightMagnitudeScorer`]: group max of the input-layer weights
//!   (dropped features score exactly zero).
//! - [`PermutationScorer`]: increase of the squared error when a feature
//!   column is shuffled (Breiman, 2001).
//!
//! [`RankingAccumulator`] keeps one score column per fold in memory and
//! merges them once into mean/std rows.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::ranking::RankingAccumulator;
//!
//! let mut acc = RankingAccumulator::new(3);
//! acc.add("fold0", vec![0.1, 0.9, 0.0]).expect("3 scores");
//! acc.add("fold1", vec![0.3, 0.7, 0.0]).expect("3 scores");
//! let ranked = acc.finalize();
//! assert_eq!(ranked[0].feature, 1);
//! assert!((ranked[0].mean - 0.8).abs() < 1e-6);
//! ```
//!
//! # References
//!
//! - Breiman, L. (2001). Random Forests. Machine Learning, 45(1).

use crate::data::Dataset;
use crate::error::{Result, SparseError};
use crate::metrics::mse;
use crate::nn::Fcnn;
use crate::primitives::Matrix;
use crate::projection::{group_max_abs, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Computes one importance score per input feature of a trained network.
pub trait FeatureScorer {
    /// Scores every input feature; scores at or below `tol` count as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` doesn't fit the network.
    fn score(&self, network: &Fcnn, data: &Dataset, tol: f32) -> Result<Vec<f32>>;

    /// Short name used to label score columns.
    fn name(&self) -> &'static str;
}

/// Scores feature `j` by `max_i |W₁[i, j]|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightMagnitudeScorer;

impl FeatureScorer for WeightMagnitudeScorer {
    fn score(&self, network: &Fcnn, _data: &Dataset, tol: f32) -> Result<Vec<f32>> {
        Ok(group_max_abs(network.input_weight(), Axis::Columns)
            .into_iter()
            .map(|m| if m <= tol { 0.0 } else { m })
            .collect())
    }

    fn name(&self) -> &'static str {
        "weight_magnitude"
    }
}

/// Scores feature `j` by the mean increase in MSE over `repeats` shuffles of
/// column `j`.
///
/// Features whose input weights are all within `tol` of zero are not
/// shuffled and score zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermutationScorer {
    repeats: usize,
    seed: u64,
}

impl PermutationScorer {
    /// Creates a scorer with `repeats` shuffles per feature.
    #[must_use]
    pub fn new(repeats: usize, seed: u64) -> Self {
        Self {
            repeats: repeats.max(1),
            seed,
        }
    }
}

impl Default for PermutationScorer {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

impl FeatureScorer for PermutationScorer {
    fn score(&self, network: &Fcnn, data: &Dataset, tol: f32) -> Result<Vec<f32>> {
        if data.n_features() != network.n_features() {
            return Err(SparseError::dimension_mismatch(
                "dataset features",
                network.n_features(),
                data.n_features(),
            ));
        }
        let baseline = mse(&network.predict(data.x())?, data.y())?;
        let alive = group_max_abs(network.input_weight(), Axis::Columns);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut scores = Vec::with_capacity(data.n_features());
        for (j, &m) in alive.iter().enumerate() {
            if m <= tol {
                scores.push(0.0);
                continue;
            }
            let mut increase = 0.0_f64;
            for _ in 0..self.repeats {
                let shuffled = shuffle_column(data.x(), j, &mut rng);
                increase += mse(&network.predict(&shuffled)?, data.y())? - baseline;
            }
            scores.push((increase / self.repeats as f64).max(0.0) as f32);
        }
        Ok(scores)
    }

    fn name(&self) -> &'static str {
        "permutation"
    }
}

fn shuffle_column(x: &Matrix<f32>, col: usize, rng: &mut StdRng) -> Matrix<f32> {
    let mut values = x.column(col).into_vec();
    values.shuffle(rng);
    let mut out = x.clone();
    for (r, v) in values.into_iter().enumerate() {
        out.set(r, col, v);
    }
    out
}

/// Merged importance of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRank {
    /// Feature index.
    pub feature: usize,
    /// Mean score across folds.
    pub mean: f64,
    /// Population standard deviation across folds.
    pub std: f64,
    /// Score of every fold, in insertion order.
    pub per_fold: Vec<f32>,
}

/// In-memory collection of per-fold score columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingAccumulator {
    n_features: usize,
    labels: Vec<String>,
    columns: Vec<Vec<f32>>,
}

impl RankingAccumulator {
    /// An empty accumulator for `n_features` features.
    #[must_use]
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            labels: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Adds the score column of one fold.
    ///
    /// # Errors
    ///
    /// Returns an error if `scores` doesn't have one entry per feature.
    pub fn add(&mut self, label: impl Into<String>, scores: Vec<f32>) -> Result<()> {
        if scores.len() != self.n_features {
            return Err(SparseError::dimension_mismatch(
                "fold scores",
                self.n_features,
                scores.len(),
            ));
        }
        self.labels.push(label.into());
        self.columns.push(scores);
        Ok(())
    }

    /// Labels of the collected columns.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of collected columns.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.columns.len()
    }

    /// Merges all columns: one row per feature, sorted by mean score
    /// descending, ties by feature index.
    ///
    /// With no columns every feature has mean and std zero.
    #[must_use]
    pub fn finalize(&self) -> Vec<FeatureRank> {
        let k = self.columns.len();
        let mut rows: Vec<FeatureRank> = (0..self.n_features)
            .map(|feature| {
                let per_fold: Vec<f32> = self.columns.iter().map(|c| c[feature]).collect();
                let (mean, std) = if k == 0 {
                    (0.0, 0.0)
                } else {
                    let mean = per_fold.iter().map(|&s| f64::from(s)).sum::<f64>() / k as f64;
                    let var = per_fold
                        .iter()
                        .map(|&s| (f64::from(s) - mean).powi(2))
                        .sum::<f64>()
                        / k as f64;
                    (mean, var.sqrt())
                };
                FeatureRank {
                    feature,
                    mean,
                    std,
                    per_fold,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.mean.total_cmp(&a.mean).then(a.feature.cmp(&b.feature)));
        rows
    }
}
