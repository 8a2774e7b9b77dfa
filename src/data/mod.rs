//! In-memory training data and the mini-batch provider contract.
//!
//! A [`Dataset`] owns the feature matrix and the label vector. The training
//! loop never touches it directly; it asks a [`BatchProvider`] for the
//! batches of one epoch, so callers can plug in their own sampling.
//! [`DataLoader`] is the provided implementation: fixed batch size and a
//! reshuffle every epoch driven by a seeded [`StdRng`].

use crate::error::{Result, SparseError};
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Feature matrix `(n_samples, n_features)` with one label per row.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::data::Dataset;
/// use sparse_fcnn::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("3x2");
/// let y = Vector::from_slice(&[10.0, 20.0, 30.0]);
/// let data = Dataset::new(x, y).expect("rows match labels");
/// assert_eq!(data.n_samples(), 3);
/// assert_eq!(data.subset(&[2, 0]).y().as_slice(), &[30.0, 10.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    x: Matrix<f32>,
    y: Vector<f32>,
    feature_names: Option<Vec<String>>,
}

impl Dataset {
    /// Creates a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if it has no rows or columns, row and label counts
    /// differ, or any value is non-finite.
    pub fn new(x: Matrix<f32>, y: Vector<f32>) -> Result<Self> {
        if x.n_rows() == 0 || x.n_cols() == 0 {
            return Err(SparseError::empty_input("dataset"));
        }
        if x.n_rows() != y.len() {
            return Err(SparseError::dimension_mismatch("labels", x.n_rows(), y.len()));
        }
        if !x.is_finite() {
            return Err(SparseError::non_finite("feature matrix"));
        }
        if !y.is_finite() {
            return Err(SparseError::non_finite("labels"));
        }
        Ok(Self {
            x,
            y,
            feature_names: None,
        })
    }

    /// Attaches one name per feature column.
    ///
    /// # Errors
    ///
    /// Returns an error if the name count differs from the column count.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.n_features() {
            return Err(SparseError::dimension_mismatch(
                "feature names",
                self.n_features(),
                names.len(),
            ));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.x.n_rows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.n_cols()
    }

    /// Feature matrix.
    #[must_use]
    pub fn x(&self) -> &Matrix<f32> {
        &self.x
    }

    /// Labels.
    #[must_use]
    pub fn y(&self) -> &Vector<f32> {
        &self.y
    }

    /// Feature names, if attached.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Name of feature `idx`, falling back to `feature_{idx}`.
    #[must_use]
    pub fn feature_name(&self, idx: usize) -> String {
        self.feature_names
            .as_ref()
            .and_then(|names| names.get(idx).cloned())
            .unwrap_or_else(|| format!("feature_{idx}"))
    }

    /// Rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select_rows(indices),
            y: self.y.select(indices),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Labels divided by `scaler`'s divisor.
    #[must_use]
    pub fn scaled(&self, scaler: &LabelScaler) -> Self {
        Self {
            x: self.x.clone(),
            y: scaler.transform(&self.y),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// One mini-batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Features, `(batch, n_features)`.
    pub x: Matrix<f32>,
    /// Labels, one per row of `x`.
    pub y: Vector<f32>,
}

impl Batch {
    /// Number of samples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// True for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Source of mini-batches for the training loop.
///
/// Every call to [`BatchProvider::epoch`] returns the batches of one full
/// pass over the data. Implementations decide the order; the provided
/// [`DataLoader`] reshuffles per epoch from its seed.
pub trait BatchProvider {
    /// Number of feature columns of every batch.
    fn n_features(&self) -> usize;

    /// Number of samples in one epoch.
    fn n_samples(&self) -> usize;

    /// Batches of the next epoch.
    fn epoch(&mut self) -> Vec<Batch>;

    /// Nominal size of a full batch, `None` when batches vary.
    fn batch_size(&self) -> Option<usize> {
        None
    }
}

/// Fixed-size batches with a seeded reshuffle every epoch.
///
/// The last batch of an epoch holds the remainder when `batch_size` doesn't
/// divide the sample count.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::data::{BatchProvider, DataLoader, Dataset};
/// use sparse_fcnn::primitives::{Matrix, Vector};
///
/// let data = Dataset::new(Matrix::zeros(5, 2), Vector::zeros(5)).expect("5 rows");
/// let mut loader = DataLoader::new(&data, 2, 7).expect("batch size > 0");
/// let sizes: Vec<usize> = loader.epoch().iter().map(|b| b.len()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl<'a> DataLoader<'a> {
    /// Creates a shuffling loader.
    ///
    /// # Errors
    ///
    /// Returns an error if `batch_size` is zero.
    pub fn new(dataset: &'a Dataset, batch_size: usize, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(SparseError::invalid_hyperparameter("batch_size", 0, "> 0"));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: true,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Keeps the dataset order in every epoch.
    #[must_use]
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }
}

impl BatchProvider for DataLoader<'_> {
    fn n_features(&self) -> usize {
        self.dataset.n_features()
    }

    fn n_samples(&self) -> usize {
        self.dataset.n_samples()
    }

    fn batch_size(&self) -> Option<usize> {
        Some(self.batch_size)
    }

    fn epoch(&mut self) -> Vec<Batch> {
        let mut order: Vec<usize> = (0..self.dataset.n_samples()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        order
            .chunks(self.batch_size)
            .map(|idx| Batch {
                x: self.dataset.x().select_rows(idx),
                y: self.dataset.y().select(idx),
            })
            .collect()
    }
}

/// Divides labels by a fixed positive constant before training and
/// multiplies error metrics back afterwards.
///
/// [`LabelScaler::fit`] uses the largest absolute label, so scaled labels
/// lie in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelScaler {
    divisor: f32,
}

impl LabelScaler {
    /// A scaler dividing by `divisor`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `divisor` is finite and positive.
    pub fn new(divisor: f32) -> Result<Self> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(SparseError::invalid_hyperparameter(
                "divisor",
                divisor,
                "finite and > 0",
            ));
        }
        Ok(Self { divisor })
    }

    /// The identity scaler.
    #[must_use]
    pub fn identity() -> Self {
        Self { divisor: 1.0 }
    }

    /// Fits the divisor to `max |y|` (identity for all-zero labels).
    #[must_use]
    pub fn fit(y: &Vector<f32>) -> Self {
        let max = y.as_slice().iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        if max > 0.0 && max.is_finite() {
            Self { divisor: max }
        } else {
            Self::identity()
        }
    }

    /// The divisor.
    #[must_use]
    pub fn divisor(&self) -> f32 {
        self.divisor
    }

    /// `y / divisor`.
    #[must_use]
    pub fn transform(&self, y: &Vector<f32>) -> Vector<f32> {
        Vector::from_vec(y.as_slice().iter().map(|v| v / self.divisor).collect())
    }

    /// `y · divisor`.
    #[must_use]
    pub fn inverse_transform(&self, y: &Vector<f32>) -> Vector<f32> {
        Vector::from_vec(y.as_slice().iter().map(|v| v * self.divisor).collect())
    }
}

impl Default for LabelScaler {
    fn default() -> Self {
        Self::identity()
    }
}
