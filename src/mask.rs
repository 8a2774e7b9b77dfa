//! Feature masks derived from projected weights.
//!
//! After the unconstrained phase, the input layer's weight matrix has been
//! projected and whole groups are exactly zero. A [`FeatureMask`] records
//! which groups survived (`group max > tol`) and is then used to gate every
//! gradient of the masked phase, so dropped features stay at zero while the
//! survivors keep training.
//!
//! A mask is immutable once built: there is no way to re-grow a dropped
//! feature.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::mask::{FeatureMask, MaskSelection};
//! use sparse_fcnn::primitives::Matrix;
//! use sparse_fcnn::projection::Axis;
//!
//! let w = Matrix::from_rows(&[vec![0.5, 0.0, 0.0], vec![-0.2, 0.0, 0.3]]).expect("rectangular");
//! let mask = FeatureMask::from_weights(&w, Axis::Columns, 1e-3).expect("finite weights");
//! assert_eq!(mask.selected_indices(), vec![0, 2]);
//!
//! let mut grad = Matrix::ones(2, 3);
//! mask.mask_gradient(&mut grad).expect("same shape");
//! assert_eq!(grad.column(1).as_slice(), &[0.0, 0.0]);
//! assert_eq!(mask.selection(), MaskSelection::Features(2));
//! ```

use crate::error::{Result, SparseError};
use crate::primitives::Matrix;
use crate::projection::{group_max_abs, Axis};
use serde::{Deserialize, Serialize};

/// Outcome of deriving a mask, so callers can flag degenerate runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskSelection {
    /// At least one feature survived.
    Features(usize),
    /// No feature survived: the masked layer is frozen at zero.
    Degenerate,
}

/// Keep/drop decision for every group of a weight matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMask {
    keep: Vec<bool>,
    axis: Axis,
}

impl FeatureMask {
    /// Derives the mask `group_max(|W|) > tol` along `axis`.
    ///
    /// # Errors
    ///
    /// Returns an error if `W` holds NaN/infinity or `tol` is negative or
    /// non-finite.
    pub fn from_weights(w: &Matrix<f32>, axis: Axis, tol: f32) -> Result<Self> {
        if !tol.is_finite() || tol < 0.0 {
            return Err(SparseError::invalid_hyperparameter("tol", tol, ">= 0 and finite"));
        }
        if !w.is_finite() {
            return Err(SparseError::non_finite("weights used for the feature mask"));
        }
        let keep = group_max_abs(w, axis).into_iter().map(|m| m > tol).collect();
        Ok(Self { keep, axis })
    }

    /// A mask keeping all `n_groups` groups.
    #[must_use]
    pub fn keep_all(n_groups: usize, axis: Axis) -> Self {
        Self {
            keep: vec![true; n_groups],
            axis,
        }
    }

    /// Axis the mask's groups run along.
    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keep.len()
    }

    /// True if the mask covers no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty()
    }

    /// Per-group keep flags.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.keep
    }

    /// Whether group `idx` is kept.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[must_use]
    pub fn is_kept(&self, idx: usize) -> bool {
        self.keep[idx]
    }

    /// Number of kept groups.
    #[must_use]
    pub fn n_selected(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }

    /// Number of dropped groups.
    #[must_use]
    pub fn n_dropped(&self) -> usize {
        self.len() - self.n_selected()
    }

    /// Indices of kept groups, ascending.
    #[must_use]
    pub fn selected_indices(&self) -> Vec<usize> {
        self.indices_where(true)
    }

    /// Indices of dropped groups, ascending.
    #[must_use]
    pub fn dropped_indices(&self) -> Vec<usize> {
        self.indices_where(false)
    }

    /// True when no group survived.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.n_selected() == 0
    }

    /// Explicit selection signal for downstream reporting.
    #[must_use]
    pub fn selection(&self) -> MaskSelection {
        match self.n_selected() {
            0 => MaskSelection::Degenerate,
            n => MaskSelection::Features(n),
        }
    }

    /// Zeroes every gradient entry of a dropped group.
    ///
    /// Called between the backward pass and the optimizer step.
    ///
    /// # Errors
    ///
    /// Returns an error if `grad` doesn't have one group per mask entry.
    pub fn mask_gradient(&self, grad: &mut Matrix<f32>) -> Result<()> {
        self.zero_dropped(grad)
    }

    /// Zeroes every weight of a dropped group.
    ///
    /// # Errors
    ///
    /// Returns an error if `w` doesn't have one group per mask entry.
    pub fn mask_weights(&self, w: &mut Matrix<f32>) -> Result<()> {
        self.zero_dropped(w)
    }

    /// True if every dropped group of `w` is exactly zero.
    #[must_use]
    pub fn is_respected_by(&self, w: &Matrix<f32>) -> bool {
        if self.axis.n_groups(w) != self.len() {
            return false;
        }
        let maxima = group_max_abs(w, self.axis);
        self.keep
            .iter()
            .zip(maxima)
            .all(|(&keep, max)| keep || max == 0.0)
    }

    fn zero_dropped(&self, m: &mut Matrix<f32>) -> Result<()> {
        let groups = self.axis.n_groups(m);
        if groups != self.len() {
            return Err(SparseError::dimension_mismatch("mask groups", self.len(), groups));
        }
        for g in self.dropped_indices() {
            for idx in self.axis.group_indices(m, g) {
                m.as_mut_slice()[idx] = 0.0;
            }
        }
        Ok(())
    }

    fn indices_where(&self, kept: bool) -> Vec<usize> {
        self.keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| (k == kept).then_some(i))
            .collect()
    }
}
