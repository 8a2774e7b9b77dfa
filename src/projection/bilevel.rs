//! Bilevel projections: reduce groups, project the reductions onto the L1
//! ball, then fit every group inside its new budget.

use super::simplex::project_l1_ball;
use super::{group_l1_norms, group_l2_norms, group_max_abs, Axis};
use crate::primitives::Matrix;

/// Bilevel L1,∞ projection.
///
/// Group maxima `v` are projected onto the L1 ball giving `u`; each entry is
/// then clipped to `[-uⱼ, uⱼ]`, which is the Euclidean projection of the
/// group onto its L∞ ball. Entries sharing the group maximum are clipped
/// identically, and a group with `uⱼ = 0` is zeroed as a whole.
pub(super) fn project_bilevel_l1inf(w: &Matrix<f32>, radius: f32, axis: Axis) -> Matrix<f32> {
    let maxima = group_max_abs(w, axis);
    let budgets = project_l1_ball(&maxima, radius);

    let mut groups = axis.groups_as_rows(w);
    for (g, &u) in budgets.iter().enumerate() {
        let row = groups.row_slice_mut(g);
        if u <= 0.0 {
            row.fill(0.0);
        } else {
            for x in row.iter_mut() {
                *x = x.clamp(-u, u);
            }
        }
    }
    axis.restore(groups)
}

/// Bilevel L1,1 projection.
///
/// Group L1 norms are projected onto the L1 ball; each group is then
/// projected onto the L1 ball of its new norm.
pub(super) fn project_l11(w: &Matrix<f32>, radius: f32, axis: Axis) -> Matrix<f32> {
    let norms = group_l1_norms(w, axis);
    let budgets = project_l1_ball(&norms, radius);

    let mut groups = axis.groups_as_rows(w);
    for (g, (&n, &u)) in norms.iter().zip(&budgets).enumerate() {
        if u >= n {
            continue;
        }
        let row = groups.row_slice_mut(g);
        let projected = project_l1_ball(row, u);
        row.copy_from_slice(&projected);
    }
    axis.restore(groups)
}

/// L2,1 projection.
///
/// Group L2 norms are projected onto the L1 ball; each group is rescaled so
/// its L2 norm equals the new value.
pub(super) fn project_l21(w: &Matrix<f32>, radius: f32, axis: Axis) -> Matrix<f32> {
    let norms = group_l2_norms(w, axis);
    let budgets = project_l1_ball(&norms, radius);

    let mut groups = axis.groups_as_rows(w);
    for (g, (&n, &u)) in norms.iter().zip(&budgets).enumerate() {
        let row = groups.row_slice_mut(g);
        if u <= 0.0 || n <= 0.0 {
            row.fill(0.0);
        } else if u < n {
            let scale = u / n;
            for x in row.iter_mut() {
                *x *= scale;
            }
        }
    }
    axis.restore(groups)
}
