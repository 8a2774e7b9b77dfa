//! Evaluation metrics for the trained regressor.
//!
//! Regression metrics (MSE, RMSE, MAE, R², signed error gaps, 1-D
//! Wasserstein distance) live here; weight sparsity and feature importance
//! live in [`sparsity`].
//!
//! Every metric accumulates in `f64`. Labels are usually trained in a
//! scaled space (see [`LabelScaler`]); [`RegressionReport::evaluate`] maps
//! the error metrics back to label units.

pub mod sparsity;

use crate::data::LabelScaler;
use crate::error::{Result, SparseError};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

fn check_pair(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<()> {
    if y_pred.len() != y_true.len() {
        return Err(SparseError::dimension_mismatch(
            "predictions",
            y_true.len(),
            y_pred.len(),
        ));
    }
    if y_true.is_empty() {
        return Err(SparseError::empty_input("metric inputs"));
    }
    Ok(())
}

fn residuals<'a>(
    y_pred: &'a Vector<f32>,
    y_true: &'a Vector<f32>,
) -> impl Iterator<Item = f64> + 'a {
    y_pred
        .as_slice()
        .iter()
        .zip(y_true.as_slice())
        .map(|(&p, &t)| f64::from(p) - f64::from(t))
}

/// Computes the Mean Squared Error (MSE).
///
/// MSE = (1/n) * `Σ(y_true` - `y_pred)²`
///
/// # Examples
///
/// ```
/// use sparse_fcnn::metrics::mse;
/// use sparse_fcnn::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[3.0, -0.5, 2.0, 7.0]);
/// let y_pred = Vector::from_slice(&[2.5, 0.0, 2.0, 8.0]);
/// let error = mse(&y_pred, &y_true).expect("same length");
/// assert!((error - 0.375).abs() < 1e-9);
/// ```
///
/// # Errors
///
/// Returns an error if the vectors differ in length or are empty.
pub fn mse(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<f64> {
    check_pair(y_pred, y_true)?;
    Ok(residuals(y_pred, y_true).map(|r| r * r).sum::<f64>() / y_true.len() as f64)
}

/// Computes the Root Mean Squared Error (RMSE).
///
/// # Errors
///
/// Returns an error if the vectors differ in length or are empty.
pub fn rmse(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<f64> {
    mse(y_pred, y_true).map(f64::sqrt)
}

/// Computes the Mean Absolute Error (MAE).
///
/// # Errors
///
/// Returns an error if the vectors differ in length or are empty.
pub fn mae(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<f64> {
    check_pair(y_pred, y_true)?;
    Ok(residuals(y_pred, y_true).map(f64::abs).sum::<f64>() / y_true.len() as f64)
}

/// Computes the coefficient of determination (R²).
///
/// Returns 0 for a constant target.
///
/// # Errors
///
/// Returns an error if the vectors differ in length or are empty.
pub fn r_squared(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<f64> {
    check_pair(y_pred, y_true)?;
    let mean = y_true.mean();
    let ss_res: f64 = residuals(y_pred, y_true).map(|r| r * r).sum();
    let ss_tot: f64 = y_true
        .as_slice()
        .iter()
        .map(|&t| (f64::from(t) - mean).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Mean signed error of under- and over-predictions.
///
/// Returns `(negative, positive)`: the mean of `pred - true` over samples
/// predicted too low and over samples predicted too high. Exact predictions
/// count in neither; a side with no samples reports 0.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::metrics::value_gap;
/// use sparse_fcnn::primitives::Vector;
///
/// let y_true = Vector::from_slice(&[10.0, 20.0, 30.0]);
/// let y_pred = Vector::from_slice(&[8.0, 23.0, 30.0]);
/// let (neg, pos) = value_gap(&y_pred, &y_true).expect("same length");
/// assert!((neg + 2.0).abs() < 1e-9);
/// assert!((pos - 3.0).abs() < 1e-9);
/// ```
///
/// # Errors
///
/// Returns an error if the vectors differ in length or are empty.
pub fn value_gap(y_pred: &Vector<f32>, y_true: &Vector<f32>) -> Result<(f64, f64)> {
    check_pair(y_pred, y_true)?;
    let (mut neg_sum, mut neg_n, mut pos_sum, mut pos_n) = (0.0_f64, 0_usize, 0.0_f64, 0_usize);
    for r in residuals(y_pred, y_true) {
        if r < 0.0 {
            neg_sum += r;
            neg_n += 1;
        } else if r > 0.0 {
            pos_sum += r;
            pos_n += 1;
        }
    }
    let mean = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
    Ok((mean(neg_sum, neg_n), mean(pos_sum, pos_n)))
}

/// Inputs of the Wasserstein distance.
///
/// `SumNormalized` divides each label vector by its own sum before
/// comparing, which only makes sense for non-negative labels; it is kept as
/// an option for reproducing earlier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WassersteinMode {
    /// Compare the raw values.
    #[default]
    Raw,
    /// Compare `u / Σu` with `v / Σv`.
    SumNormalized,
}

/// First Wasserstein distance between the empirical distributions of `u`
/// and `v` (equal weights per sample; sizes may differ).
///
/// Computed as `∫ |F_u(x) - F_v(x)| dx` over the merged support.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::metrics::{wasserstein_distance, WassersteinMode};
/// use sparse_fcnn::primitives::Vector;
///
/// let u = Vector::from_slice(&[0.0, 1.0, 3.0]);
/// let v = Vector::from_slice(&[5.0, 6.0, 8.0]);
/// let d = wasserstein_distance(&u, &v, WassersteinMode::Raw).expect("non-empty");
/// assert!((d - 5.0).abs() < 1e-9);
/// ```
///
/// # Errors
///
/// Returns an error if either input is empty, or if a sum-normalized input
/// sums to zero.
pub fn wasserstein_distance(
    u: &Vector<f32>,
    v: &Vector<f32>,
    mode: WassersteinMode,
) -> Result<f64> {
    if u.is_empty() || v.is_empty() {
        return Err(SparseError::empty_input("wasserstein inputs"));
    }
    let prepare = |x: &Vector<f32>| -> Result<Vec<f64>> {
        let mut values: Vec<f64> = x.as_slice().iter().map(|&a| f64::from(a)).collect();
        if mode == WassersteinMode::SumNormalized {
            let total: f64 = values.iter().sum();
            if total == 0.0 || !total.is_finite() {
                return Err(SparseError::non_finite("sum-normalized wasserstein input"));
            }
            for a in &mut values {
                *a /= total;
            }
        }
        values.sort_by(f64::total_cmp);
        Ok(values)
    };
    let u = prepare(u)?;
    let v = prepare(v)?;

    let mut all: Vec<f64> = u.iter().chain(&v).copied().collect();
    all.sort_by(f64::total_cmp);

    let cdf = |sorted: &[f64], x: f64| {
        sorted.partition_point(|&a| a <= x) as f64 / sorted.len() as f64
    };
    let distance = all
        .windows(2)
        .map(|w| (cdf(&u, w[0]) - cdf(&v, w[0])).abs() * (w[1] - w[0]))
        .sum();
    Ok(distance)
}

/// Regression metrics of one prediction set, in label units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Mean squared error in the scaled space.
    pub mse: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
    /// Mean error of under-predictions (non-positive).
    pub negative_gap: f64,
    /// Mean error of over-predictions (non-negative).
    pub positive_gap: f64,
    /// Wasserstein distance between predicted and true labels.
    pub wasserstein: f64,
}

impl RegressionReport {
    /// Evaluates predictions made in the scaled label space.
    ///
    /// MSE and R² stay in the scaled space; RMSE, MAE, the gaps and the
    /// Wasserstein distance are multiplied back by `scaler`'s divisor.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors differ in length or are empty, or if
    /// the Wasserstein mode can't normalize them.
    pub fn evaluate(
        y_pred: &Vector<f32>,
        y_true: &Vector<f32>,
        scaler: &LabelScaler,
        mode: WassersteinMode,
    ) -> Result<Self> {
        let scale = f64::from(scaler.divisor());
        let (negative_gap, positive_gap) = value_gap(y_pred, y_true)?;
        Ok(Self {
            mse: mse(y_pred, y_true)?,
            rmse: rmse(y_pred, y_true)? * scale,
            mae: mae(y_pred, y_true)? * scale,
            r2: r_squared(y_pred, y_true)?,
            negative_gap: negative_gap * scale,
            positive_gap: positive_gap * scale,
            wasserstein: wasserstein_distance(y_pred, y_true, mode)? * scale,
        })
    }
}

#[cfg(test)]
#[path = "tests_regression_contract.rs"]
mod tests_regression_contract;
