//! Projection onto the L1 ball, the building block of every bilevel variant.

use std::cmp::Ordering;

/// Soft-threshold level τ for projecting magnitudes onto the L1 ball.
///
/// Returns the smallest `τ >= 0` with `Σ max(aᵢ - τ, 0) <= radius`. When the
/// magnitudes already fit in the ball the result is `0`.
///
/// Magnitudes are sorted once in descending order (stable, so equal values
/// keep their input order and the result never depends on how ties are
/// broken), and prefix sums are accumulated in `f64`.
///
/// # Example
///
/// ```
/// use sparse_fcnn::projection::l1_threshold;
///
/// // 3 + 2 + 1 = 6 must shrink to 4: each value loses 2/3
/// let tau = l1_threshold(&[3.0, 2.0, 1.0], 4.0);
/// assert!((tau - 2.0 / 3.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn l1_threshold(magnitudes: &[f32], radius: f32) -> f64 {
    let radius = f64::from(radius.max(0.0));
    let total: f64 = magnitudes.iter().map(|&a| f64::from(a.abs())).sum();
    if total <= radius {
        return 0.0;
    }

    let mut sorted: Vec<f64> = magnitudes.iter().map(|&a| f64::from(a.abs())).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let mut cumsum = 0.0;
    let mut tau = 0.0;
    for (k, &a) in sorted.iter().enumerate() {
        cumsum += a;
        let candidate = (cumsum - radius) / (k + 1) as f64;
        if a > candidate {
            tau = candidate;
        } else {
            break;
        }
    }
    tau.max(0.0)
}

/// Projects `v` onto the L1 ball `{x : ‖x‖₁ <= radius}`.
///
/// Signs are kept and every magnitude is shrunk by the common threshold of
/// [`l1_threshold`]; entries at or below the threshold become exactly zero.
/// A vector already inside the ball is returned unchanged, and a radius of
/// zero (or less) gives the zero vector.
///
/// # Example
///
/// ```
/// use sparse_fcnn::projection::project_l1_ball;
///
/// let p = project_l1_ball(&[3.0, -2.0, 1.0], 4.0);
/// assert!((p[0] - 7.0 / 3.0).abs() < 1e-6);
/// assert!((p[1] + 4.0 / 3.0).abs() < 1e-6);
/// assert!((p[2] - 1.0 / 3.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn project_l1_ball(v: &[f32], radius: f32) -> Vec<f32> {
    if radius <= 0.0 {
        return vec![0.0; v.len()];
    }
    let tau = l1_threshold(v, radius);
    if tau == 0.0 {
        return v.to_vec();
    }
    v.iter()
        .map(|&x| {
            let shrunk = f64::from(x.abs()) - tau;
            if shrunk > 0.0 {
                (shrunk as f32).copysign(x)
            } else {
                0.0
            }
        })
        .collect()
}
