//! Exact Euclidean projection onto the L1,∞ ball.
//!
//! The minimiser clips group `j` at a level `μⱼ >= 0`. All groups that stay
//! non-zero lose the same L1 mass `θ = Σᵢ (|wᵢⱼ| - μⱼ)₊`, groups whose whole
//! L1 norm is at most `θ` vanish, and the levels satisfy `Σⱼ μⱼ = radius`.
//! `Σⱼ μⱼ(θ)` is continuous and non-increasing in θ, so θ is found by
//! bisection after sorting each group once.

use super::Axis;
use crate::primitives::Matrix;
use std::cmp::Ordering;

const BISECTION_STEPS: usize = 100;

/// Sorted magnitudes of one group with their prefix sums.
struct SortedGroup {
    desc: Vec<f64>,
    prefix: Vec<f64>,
}

impl SortedGroup {
    fn new(values: &[f32]) -> Self {
        let mut desc: Vec<f64> = values.iter().map(|&x| f64::from(x.abs())).collect();
        desc.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        let mut prefix = Vec::with_capacity(desc.len());
        let mut acc = 0.0;
        for &a in &desc {
            acc += a;
            prefix.push(acc);
        }
        Self { desc, prefix }
    }

    fn l1(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    /// Clipping level μ with `Σ (aᵢ - μ)₊ = θ`, or 0 when the group vanishes.
    fn level(&self, theta: f64) -> f64 {
        if self.l1() <= theta {
            return 0.0;
        }
        let n = self.desc.len();
        for k in 0..n {
            let mu = (self.prefix[k] - theta) / (k + 1) as f64;
            let next = if k + 1 < n { self.desc[k + 1] } else { 0.0 };
            if mu >= next {
                return mu.max(0.0);
            }
        }
        0.0
    }
}

pub(super) fn project_l1inf(w: &Matrix<f32>, radius: f32, axis: Axis) -> Matrix<f32> {
    let mut groups = axis.groups_as_rows(w);
    let sorted: Vec<SortedGroup> = (0..groups.n_rows())
        .map(|g| SortedGroup::new(groups.row_slice(g)))
        .collect();

    let radius = f64::from(radius);
    let total_max: f64 = sorted.iter().map(|s| s.desc.first().copied().unwrap_or(0.0)).sum();
    if total_max <= radius {
        return w.clone();
    }

    let levels_sum = |theta: f64| -> f64 { sorted.iter().map(|s| s.level(theta)).sum() };

    // levels_sum(0) = total_max > radius, levels_sum(max l1) = 0 < radius
    let mut lo = 0.0_f64;
    let mut hi = sorted.iter().map(SortedGroup::l1).fold(0.0, f64::max);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if levels_sum(mid) > radius {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    for (g, s) in sorted.iter().enumerate() {
        let mu = s.level(hi) as f32;
        let row = groups.row_slice_mut(g);
        if mu <= 0.0 {
            row.fill(0.0);
        } else {
            for x in row.iter_mut() {
                *x = x.clamp(-mu, mu);
            }
        }
    }
    axis.restore(groups)
}
