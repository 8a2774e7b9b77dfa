use super::*;

const ALL_KINDS: [ProjectionKind; 6] = [
    ProjectionKind::None,
    ProjectionKind::L1,
    ProjectionKind::L11,
    ProjectionKind::L21,
    ProjectionKind::L1Inf,
    ProjectionKind::BilevelL1Inf,
];

fn scenario_matrix() -> Matrix<f32> {
    Matrix::from_rows(&[vec![3.0, 0.0, 1.0], vec![0.0, 2.0, 0.0]]).expect("rectangular rows")
}

fn assert_close(a: &Matrix<f32>, b: &Matrix<f32>, tol: f32) {
    assert_eq!(a.shape(), b.shape());
    for (i, (x, y)) in a.as_slice().iter().zip(b.as_slice()).enumerate() {
        assert!((x - y).abs() <= tol, "entry {i}: {x} vs {y}");
    }
}

#[test]
fn test_bilevel_scenario_columns_radius_four() {
    // group maxima [3, 2, 1] lose 2/3 each to fit a budget of 4
    let w = scenario_matrix();
    let p = project(&w, 4.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");

    let expected = Matrix::from_rows(&[
        vec![7.0 / 3.0, 0.0, 1.0 / 3.0],
        vec![0.0, 4.0 / 3.0, 0.0],
    ])
    .expect("rectangular rows");
    assert_close(&p, &expected, 1e-5);

    let maxima = group_max_abs(&p, Axis::Columns);
    assert!((maxima.iter().sum::<f32>() - 4.0).abs() < 1e-5);
    assert!(maxima[2] > 0.0, "third column is shrunk, not dropped");
}

#[test]
fn test_exact_l1inf_agrees_with_bilevel_on_single_entry_groups() {
    let w = scenario_matrix();
    let exact = project(&w, 4.0, Axis::Columns, ProjectionKind::L1Inf).expect("valid input");
    let bilevel =
        project(&w, 4.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    assert_close(&exact, &bilevel, 1e-4);
}

#[test]
fn test_bilevel_drops_weak_columns() {
    let w = scenario_matrix();
    let p = project(&w, 1.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    // τ = 2: only the first column survives with max 1
    assert!((p.get(0, 0) - 1.0).abs() < 1e-6);
    assert_eq!(p.get(1, 1), 0.0);
    assert_eq!(p.get(0, 2), 0.0);
}

#[test]
fn test_rows_axis_groups_neurons() {
    let w = scenario_matrix();
    // row maxima [3, 2], budget 3 → τ = 1, rows clipped at 2 and 1
    let p = project(&w, 3.0, Axis::Rows, ProjectionKind::BilevelL1Inf).expect("valid input");
    assert!((p.get(0, 0) - 2.0).abs() < 1e-6);
    assert!((p.get(0, 2) - 1.0).abs() < 1e-6);
    assert!((p.get(1, 1) - 1.0).abs() < 1e-6);
}

#[test]
fn test_clipping_keeps_small_entries_in_surviving_group() {
    let w = Matrix::from_rows(&[vec![4.0, 0.0], vec![-0.5, 1.0], vec![2.0, 0.0]])
        .expect("rectangular rows");
    // column maxima [4, 1], budget 3 → τ = 1, column 0 clipped at 3
    let p = project(&w, 3.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    assert!((p.get(0, 0) - 3.0).abs() < 1e-6);
    assert!((p.get(1, 0) + 0.5).abs() < 1e-6);
    assert!((p.get(2, 0) - 2.0).abs() < 1e-6);
    assert_eq!(p.get(1, 1), 0.0);
}

#[test]
fn test_exact_l1inf_shares_residual_mass() {
    // column 0 = [4, 2], column 1 = [1, 0]
    let w = Matrix::from_rows(&[vec![4.0, 1.0], vec![2.0, 0.0]]).expect("rectangular rows");
    let p = project(&w, 2.0, Axis::Columns, ProjectionKind::L1Inf).expect("valid input");
    // column 1 has l1 = 1 <= θ, column 0 clipped at μ = 2 (loses θ = 2)
    let maxima = group_max_abs(&p, Axis::Columns);
    assert!((maxima[0] - 2.0).abs() < 1e-4);
    assert_eq!(maxima[1], 0.0);
    assert!((p.get(1, 0) - 2.0).abs() < 1e-4);
}

#[test]
fn test_l21_rescales_groups() {
    let w = Matrix::from_rows(&[vec![3.0, 0.0], vec![4.0, 1.0]]).expect("rectangular rows");
    // column norms [5, 1], budget 4 → τ = 1, column 0 scaled to norm 4, column 1 dropped
    let p = project(&w, 4.0, Axis::Columns, ProjectionKind::L21).expect("valid input");
    assert!((p.get(0, 0) - 2.4).abs() < 1e-5);
    assert!((p.get(1, 0) - 3.2).abs() < 1e-5);
    assert_eq!(p.get(1, 1), 0.0);
}

#[test]
fn test_l11_zeroes_whole_columns() {
    let w = Matrix::from_rows(&[vec![2.0, 0.5], vec![2.0, 0.25]]).expect("rectangular rows");
    // column l1 norms [4, 0.75], budget 2 → τ = 2, column 1 dropped
    let p = project(&w, 2.0, Axis::Columns, ProjectionKind::L11).expect("valid input");
    assert!((p.get(0, 0) - 1.0).abs() < 1e-5);
    assert!((p.get(1, 0) - 1.0).abs() < 1e-5);
    assert_eq!(p.get(0, 1), 0.0);
    assert_eq!(p.get(1, 1), 0.0);
}

#[test]
fn test_l1_projects_flattened_matrix() {
    let w = scenario_matrix();
    let p = project(&w, 3.0, Axis::Columns, ProjectionKind::L1).expect("valid input");
    let norm: f32 = p.as_slice().iter().map(|x| x.abs()).sum();
    assert!((norm - 3.0).abs() < 1e-5);
    assert_eq!(p.get(0, 2), 0.0);
}

#[test]
fn test_large_radius_is_identity_for_every_kind() {
    let w = Matrix::from_rows(&[vec![0.3, -1.2, 0.0], vec![2.5, 0.1, -0.7]])
        .expect("rectangular rows");
    for kind in ALL_KINDS {
        for axis in [Axis::Rows, Axis::Columns] {
            let p = project(&w, 100.0, axis, kind).expect("valid input");
            assert_eq!(p, w, "{kind:?} along {axis:?} must be a no-op");
        }
    }
}

#[test]
fn test_all_zero_matrix_stays_zero() {
    let w = Matrix::zeros(4, 5);
    for kind in ALL_KINDS {
        let p = project(&w, 0.5, Axis::Columns, kind).expect("valid input");
        assert!(p.as_slice().iter().all(|&x| x == 0.0));
    }
}

#[test]
fn test_zero_columns_do_not_consume_budget() {
    let w = Matrix::from_rows(&[vec![0.0, 2.0, 0.0], vec![0.0, -1.0, 0.0]])
        .expect("rectangular rows");
    let p = project(&w, 2.0, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    assert_eq!(p, w);
}

#[test]
fn test_rejects_non_positive_radius() {
    let w = scenario_matrix();
    for radius in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let err = project(&w, radius, Axis::Columns, ProjectionKind::BilevelL1Inf)
            .expect_err("radius must be rejected");
        assert!(matches!(err, SparseError::InvalidRadius { .. }));
    }
}

#[test]
fn test_rejects_non_finite_entries() {
    let mut w = scenario_matrix();
    w.set(1, 2, f32::NAN);
    let err = project(&w, 1.0, Axis::Columns, ProjectionKind::L21).expect_err("NaN rejected");
    assert!(matches!(err, SparseError::NonFinite { .. }));

    w.set(1, 2, f32::NEG_INFINITY);
    assert!(project(&w, 1.0, Axis::Rows, ProjectionKind::None).is_err());
}

#[test]
fn test_identical_inputs_give_identical_outputs() {
    let w = Matrix::from_rows(&[vec![1.0, 1.0, 1.0, 0.5], vec![-1.0, 0.2, 1.0, 0.5]])
        .expect("rectangular rows");
    let a = project(&w, 1.5, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    let b = project(&w, 1.5, Axis::Columns, ProjectionKind::BilevelL1Inf).expect("valid input");
    assert_eq!(a, b);
    // the three tied columns are treated alike
    let maxima = group_max_abs(&a, Axis::Columns);
    assert!((maxima[0] - maxima[1]).abs() < 1e-7);
    assert!((maxima[1] - maxima[2]).abs() < 1e-7);
}

#[test]
fn test_kind_dispatch_and_names() {
    let w = scenario_matrix();
    let direct = ProjectionKind::L21
        .project(&w, 2.0, Axis::Columns)
        .expect("valid input");
    let free = project(&w, 2.0, Axis::Columns, ProjectionKind::L21).expect("valid input");
    assert_eq!(direct, free);
    assert_eq!(ProjectionKind::BilevelL1Inf.name(), "bilevel_proj_l1infball");
    assert!(!ProjectionKind::None.is_active());
}

#[test]
fn test_group_norms() {
    let w = scenario_matrix();
    assert_eq!(group_max_abs(&w, Axis::Columns), vec![3.0, 2.0, 1.0]);
    assert_eq!(group_max_abs(&w, Axis::Rows), vec![3.0, 2.0]);
    assert_eq!(group_l1_norms(&w, Axis::Rows), vec![4.0, 2.0]);
    let l2 = group_l2_norms(&w, Axis::Rows);
    assert!((l2[0] - 10.0_f32.sqrt()).abs() < 1e-6);
}

#[test]
fn test_axis_serde_aliases() {
    let a: Axis = serde_json::from_str("\"features\"").expect("alias accepted");
    assert_eq!(a, Axis::Columns);
    let b: Axis = serde_json::from_str("\"neurons\"").expect("alias accepted");
    assert_eq!(b, Axis::Rows);
    let k: ProjectionKind = serde_json::from_str("\"bilevel_l1_inf\"").expect("snake case");
    assert_eq!(k, ProjectionKind::BilevelL1Inf);
}
