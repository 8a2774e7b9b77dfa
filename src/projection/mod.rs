//! Euclidean projections onto structured-sparsity norm balls.
//!
//! Every projection shares one entry point, [`project`], and differs only in
//! how a weight matrix is split into groups and how each group is reduced:
//!
//! | Kind | Group reduction | Inner step |
//! |------|-----------------|------------|
//! | [`ProjectionKind::L1`] | whole matrix as one vector | soft-threshold |
//! | [`ProjectionKind::L11`] | `‖g‖₁` | L1 ball of the new radius |
//! | [`ProjectionKind::L21`] | `‖g‖₂` | rescale to the new norm |
//! | [`ProjectionKind::L1Inf`] | exact `ℓ1,∞` ball | common residual mass θ |
//! | [`ProjectionKind::BilevelL1Inf`] | `‖g‖∞` | clip to the new maximum |
//!
//! A group is a row or a column of the matrix, selected by [`Axis`]. With
//! `[out_features, in_features]` weights, [`Axis::Columns`] groups all the
//! connections leaving one input feature, so a zeroed group is a dropped
//! feature.
//!
//! The bilevel variants reduce each group to a scalar, project the vector of
//! scalars onto the L1 ball with [`project_l1_ball`], then push every group
//! back inside its new scalar budget. With a sort-based threshold the whole
//! projection is `O(n log n)` in the number of entries.
//!
//! # Example
//!
//! ```
//! use sparse_fcnn::primitives::Matrix;
//! use sparse_fcnn::projection::{project, group_max_abs, Axis, ProjectionKind};
//!
//! let w = Matrix::from_rows(&[vec![3.0, 0.0, 1.0], vec![0.0, 2.0, 0.0]]).expect("rectangular");
//! let p = project(&w, 4.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
//!
//! let budget: f32 = group_max_abs(&p, Axis::Columns).iter().sum();
//! assert!((budget - 4.0).abs() < 1e-5);
//! ```
//!
//! # References
//!
//! - Duchi, J., et al. (2008). Efficient projections onto the l1-ball for
//!   learning in high dimensions. ICML.
//! - Quattoni, A., et al. (2009). An efficient projection for l1,∞
//!   regularization. ICML.
//! - Barlaud, M., Perez, G., & Marmorat, J.-P. (2024). Linear time bi-level
//!   l1,∞ projection. arXiv:2407.16293.

mod bilevel;
mod l1inf;
mod simplex;

pub use simplex::{l1_threshold, project_l1_ball};

use crate::error::{Result, SparseError};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};

/// Dimension of a weight matrix whose slices form the sparsity groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Each row is a group (output neurons for `[out, in]` weights).
    #[serde(alias = "neurons")]
    Rows,
    /// Each column is a group (input features for `[out, in]` weights).
    #[default]
    #[serde(alias = "features")]
    Columns,
}

impl Axis {
    /// Number of groups of `w` along this axis.
    #[must_use]
    pub fn n_groups(self, w: &Matrix<f32>) -> usize {
        match self {
            Axis::Rows => w.n_rows(),
            Axis::Columns => w.n_cols(),
        }
    }

    /// Number of entries in each group of `w`.
    #[must_use]
    pub fn group_len(self, w: &Matrix<f32>) -> usize {
        match self {
            Axis::Rows => w.n_cols(),
            Axis::Columns => w.n_rows(),
        }
    }

    /// Re-lays `w` so that every group is a contiguous row.
    pub(crate) fn groups_as_rows(self, w: &Matrix<f32>) -> Matrix<f32> {
        match self {
            Axis::Rows => w.clone(),
            Axis::Columns => w.transpose(),
        }
    }

    /// Inverse of [`Axis::groups_as_rows`].
    pub(crate) fn restore(self, groups: Matrix<f32>) -> Matrix<f32> {
        match self {
            Axis::Rows => groups,
            Axis::Columns => groups.transpose(),
        }
    }

    /// Flat indices of the entries belonging to group `g`.
    pub(crate) fn group_indices(self, w: &Matrix<f32>, g: usize) -> Vec<usize> {
        let (rows, cols) = w.shape();
        match self {
            Axis::Rows => (g * cols..(g + 1) * cols).collect(),
            Axis::Columns => (0..rows).map(|r| r * cols + g).collect(),
        }
    }
}

/// The family of norm balls a weight matrix can be projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// No projection: the matrix is returned unchanged.
    None,
    /// L1 ball over all entries.
    L1,
    /// Bilevel L1,1 ball (group L1 norms, then L1 inside each group).
    L11,
    /// L2,1 ball (group L2 norms, rescaled).
    L21,
    /// Exact L1,∞ ball.
    L1Inf,
    /// Bilevel L1,∞ ball (group maxima, then clipping).
    #[default]
    BilevelL1Inf,
}

impl ProjectionKind {
    /// Stable display name, used in logs and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProjectionKind::None => "no_proj",
            ProjectionKind::L1 => "proj_l1ball",
            ProjectionKind::L11 => "proj_l11ball",
            ProjectionKind::L21 => "proj_l21ball",
            ProjectionKind::L1Inf => "proj_l1infball",
            ProjectionKind::BilevelL1Inf => "bilevel_proj_l1infball",
        }
    }

    /// Whether this kind changes anything at all.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != ProjectionKind::None
    }

    /// Projects `w` onto this kind's ball of the given radius.
    ///
    /// # Errors
    ///
    /// See [`project`].
    pub fn project(self, w: &Matrix<f32>, radius: f32, axis: Axis) -> Result<Matrix<f32>> {
        project(w, radius, axis, self)
    }
}

/// Projects `w` onto the `kind` ball of radius `radius` along `axis`.
///
/// The result has the same shape as `w`. Signs are preserved and entries are
/// either kept, shrunk towards zero, or set to exactly zero. When `w` is
/// already inside the ball it is returned unchanged.
///
/// # Errors
///
/// - [`SparseError::InvalidRadius`] if `radius` is not a finite value `> 0`
/// - [`SparseError::NonFinite`] if `w` contains NaN or infinity
pub fn project(
    w: &Matrix<f32>,
    radius: f32,
    axis: Axis,
    kind: ProjectionKind,
) -> Result<Matrix<f32>> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(SparseError::InvalidRadius { radius });
    }
    if !w.is_finite() {
        return Err(SparseError::non_finite("matrix to project"));
    }

    let projected = match kind {
        ProjectionKind::None => w.clone(),
        ProjectionKind::L1 => {
            let data = project_l1_ball(w.as_slice(), radius);
            Matrix::from_vec(w.n_rows(), w.n_cols(), data)?
        }
        ProjectionKind::L11 => bilevel::project_l11(w, radius, axis),
        ProjectionKind::L21 => bilevel::project_l21(w, radius, axis),
        ProjectionKind::L1Inf => l1inf::project_l1inf(w, radius, axis),
        ProjectionKind::BilevelL1Inf => bilevel::project_bilevel_l1inf(w, radius, axis),
    };
    Ok(projected)
}

/// Maximum absolute value of every group.
#[must_use]
pub fn group_max_abs(w: &Matrix<f32>, axis: Axis) -> Vec<f32> {
    reduce_groups(w, axis, |g| g.iter().fold(0.0_f32, |m, x| m.max(x.abs())))
}

/// L1 norm of every group.
#[must_use]
pub fn group_l1_norms(w: &Matrix<f32>, axis: Axis) -> Vec<f32> {
    reduce_groups(w, axis, |g| {
        g.iter().map(|&x| f64::from(x.abs())).sum::<f64>() as f32
    })
}

/// L2 norm of every group.
#[must_use]
pub fn group_l2_norms(w: &Matrix<f32>, axis: Axis) -> Vec<f32> {
    reduce_groups(w, axis, |g| {
        g.iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt() as f32
    })
}

fn reduce_groups(w: &Matrix<f32>, axis: Axis, f: impl Fn(&[f32]) -> f32) -> Vec<f32> {
    let groups = axis.groups_as_rows(w);
    (0..groups.n_rows()).map(|g| f(groups.row_slice(g))).collect()
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests_projection_contract.rs"]
mod tests_projection_contract;
