// =========================================================================
// Regression metric contract
//
// - MSE >= 0, RMSE² == MSE, MAE <= RMSE
// - R² == 1 for perfect predictions, R² <= 1 always
// - gaps: negative <= 0 <= positive
// - Wasserstein: zero on identical inputs, symmetric, order independent,
//   equals the shift for translated samples
// =========================================================================

use super::*;
use crate::primitives::Vector;
use proptest::prelude::*;

fn pair_strategy() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (1usize..40).prop_flat_map(|n| {
        (
            proptest::collection::vec(-50.0f32..50.0, n),
            proptest::collection::vec(-50.0f32..50.0, n),
        )
    })
}

#[test]
fn falsify_mr_001_perfect_predictions() {
    let y = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(mse(&y, &y).expect("same length"), 0.0);
    assert_eq!(mae(&y, &y).expect("same length"), 0.0);
    assert!((r_squared(&y, &y).expect("same length") - 1.0).abs() < 1e-12);
    assert_eq!(value_gap(&y, &y).expect("same length"), (0.0, 0.0));
    assert_eq!(wasserstein_distance(&y, &y, WassersteinMode::Raw).expect("non-empty"), 0.0);
}

#[test]
fn falsify_mr_002_r2_negative_for_bad_predictions() {
    let y_true = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let y_pred = Vector::from_slice(&[10.0, 20.0, 30.0, 40.0, 50.0]);
    assert!(r_squared(&y_pred, &y_true).expect("same length") < 0.0);
}

#[test]
fn falsify_mr_003_constant_target() {
    let y_true = Vector::from_slice(&[2.0, 2.0, 2.0]);
    let y_pred = Vector::from_slice(&[1.0, 2.0, 3.0]);
    assert_eq!(r_squared(&y_pred, &y_true).expect("same length"), 0.0);
}

#[test]
fn falsify_mr_004_length_mismatch_is_an_error() {
    let a = Vector::from_slice(&[1.0, 2.0]);
    let b = Vector::from_slice(&[1.0, 2.0, 3.0]);
    assert!(matches!(mse(&a, &b), Err(SparseError::DimensionMismatch { .. })));
    assert!(mae(&a, &b).is_err());
    assert!(value_gap(&a, &b).is_err());
    let empty = Vector::from_vec(Vec::new());
    assert!(mse(&empty, &empty).is_err());
    assert!(wasserstein_distance(&empty, &a, WassersteinMode::Raw).is_err());
}

#[test]
fn falsify_mr_005_wasserstein_unequal_sizes() {
    // F_u jumps to 1 at 0; F_v is 1/2 on [0, 2): area 1
    let u = Vector::from_slice(&[0.0]);
    let v = Vector::from_slice(&[0.0, 2.0]);
    let d = wasserstein_distance(&u, &v, WassersteinMode::Raw).expect("non-empty");
    assert!((d - 1.0).abs() < 1e-12);
}

#[test]
fn falsify_mr_006_wasserstein_sum_normalized() {
    let u = Vector::from_slice(&[1.0, 3.0]);
    let v = Vector::from_slice(&[2.0, 6.0]);
    // both normalize to [0.25, 0.75]
    let d = wasserstein_distance(&u, &v, WassersteinMode::SumNormalized).expect("non-zero sums");
    assert!(d.abs() < 1e-12);
    let raw = wasserstein_distance(&u, &v, WassersteinMode::Raw).expect("non-empty");
    assert!((raw - 2.0).abs() < 1e-12);

    let zero_sum = Vector::from_slice(&[1.0, -1.0]);
    assert!(wasserstein_distance(&zero_sum, &v, WassersteinMode::SumNormalized).is_err());
}

#[test]
fn falsify_mr_007_report_scales_back_to_label_units() {
    let y_true = Vector::from_slice(&[0.5, 0.25, 1.0]);
    let y_pred = Vector::from_slice(&[0.5, 0.5, 0.75]);
    let scaler = LabelScaler::new(80.0).expect("positive");
    let report = RegressionReport::evaluate(&y_pred, &y_true, &scaler, WassersteinMode::Raw)
        .expect("same length");
    assert!((report.mae - 80.0 * 0.5 / 3.0).abs() < 1e-9);
    assert!((report.negative_gap + 20.0).abs() < 1e-9);
    assert!((report.positive_gap - 20.0).abs() < 1e-9);
    assert!((report.rmse - 80.0 * report.mse.sqrt()).abs() < 1e-9);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_error_metric_ordering((p, t) in pair_strategy()) {
        let p = Vector::from_vec(p);
        let t = Vector::from_vec(t);
        let m = mse(&p, &t).expect("same length");
        let r = rmse(&p, &t).expect("same length");
        let a = mae(&p, &t).expect("same length");
        prop_assert!(m >= 0.0);
        prop_assert!((r * r - m).abs() <= 1e-9 * m.max(1.0));
        prop_assert!(a <= r + 1e-9);
        prop_assert!(r_squared(&p, &t).expect("same length") <= 1.0 + 1e-12);
        let (neg, pos) = value_gap(&p, &t).expect("same length");
        prop_assert!(neg <= 0.0 && pos >= 0.0);
    }

    #[test]
    fn prop_wasserstein_symmetric_and_order_free((p, t) in pair_strategy()) {
        let u = Vector::from_vec(p.clone());
        let v = Vector::from_vec(t);
        let d_uv = wasserstein_distance(&u, &v, WassersteinMode::Raw).expect("non-empty");
        let d_vu = wasserstein_distance(&v, &u, WassersteinMode::Raw).expect("non-empty");
        prop_assert!(d_uv >= 0.0);
        prop_assert!((d_uv - d_vu).abs() <= 1e-9 * d_uv.max(1.0));

        let mut reversed = p;
        reversed.reverse();
        let d_rev = wasserstein_distance(&Vector::from_vec(reversed), &v, WassersteinMode::Raw)
            .expect("non-empty");
        prop_assert!((d_uv - d_rev).abs() <= 1e-9 * d_uv.max(1.0));
    }

    #[test]
    fn prop_wasserstein_of_shift_is_shift(
        values in proptest::collection::vec(-20.0f32..20.0, 1..30),
        shift in 0.0f32..10.0,
    ) {
        let u = Vector::from_vec(values.clone());
        let v = Vector::from_vec(values.iter().map(|x| x + shift).collect());
        let d = wasserstein_distance(&u, &v, WassersteinMode::Raw).expect("non-empty");
        prop_assert!((d - f64::from(shift)).abs() < 1e-4, "d = {}, shift = {}", d, shift);
    }
}
