// =========================================================================
// Projection contract: properties every projection kind must satisfy on
// arbitrary finite matrices and radii.
//
// - idempotence:        P(P(W)) == P(W)
// - budget:             ball norm of P(W) <= r + ε
// - no-op:              W inside the ball ⇒ P(W) == W
// - sign preservation:  P(W)ᵢⱼ is 0 or has the sign of Wᵢⱼ, never larger
// - monotonicity:       a larger radius never zeroes more groups
// =========================================================================

use super::*;
use proptest::prelude::*;

const KINDS: [ProjectionKind; 5] = [
    ProjectionKind::L1,
    ProjectionKind::L11,
    ProjectionKind::L21,
    ProjectionKind::L1Inf,
    ProjectionKind::BilevelL1Inf,
];

fn matrix_strategy() -> impl Strategy<Value = Matrix<f32>> {
    (1usize..6, 1usize..8).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(
            prop_oneof![3 => -5.0f32..5.0, 1 => Just(0.0f32)],
            rows * cols,
        )
        .prop_map(move |data| Matrix::from_vec(rows, cols, data).expect("generated shape"))
    })
}

fn axis_strategy() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::Rows), Just(Axis::Columns)]
}

/// The norm whose ball `kind` projects onto.
fn ball_norm(w: &Matrix<f32>, axis: Axis, kind: ProjectionKind) -> f32 {
    match kind {
        ProjectionKind::None => 0.0,
        ProjectionKind::L1 => w.as_slice().iter().map(|x| x.abs()).sum(),
        ProjectionKind::L11 => group_l1_norms(w, axis).iter().sum(),
        ProjectionKind::L21 => group_l2_norms(w, axis).iter().sum(),
        ProjectionKind::L1Inf | ProjectionKind::BilevelL1Inf => {
            group_max_abs(w, axis).iter().sum()
        }
    }
}

fn zero_groups(w: &Matrix<f32>, axis: Axis) -> usize {
    group_max_abs(w, axis).iter().filter(|&&m| m == 0.0).count()
}

fn max_abs_diff(a: &Matrix<f32>, b: &Matrix<f32>) -> f32 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn projection_is_idempotent(
        w in matrix_strategy(),
        axis in axis_strategy(),
        radius in 0.1f32..10.0,
    ) {
        for kind in KINDS {
            let once = project(&w, radius, axis, kind).expect("valid input");
            let twice = project(&once, radius, axis, kind).expect("valid input");
            let diff = max_abs_diff(&once, &twice);
            prop_assert!(diff <= 1e-4, "{:?}: second projection moved entries by {}", kind, diff);
        }
    }

    #[test]
    fn projection_respects_budget(
        w in matrix_strategy(),
        axis in axis_strategy(),
        radius in 0.1f32..10.0,
    ) {
        for kind in KINDS {
            let p = project(&w, radius, axis, kind).expect("valid input");
            let norm = ball_norm(&p, axis, kind);
            prop_assert!(
                norm <= radius + 1e-4 * radius.max(1.0),
                "{:?}: norm {} exceeds radius {}", kind, norm, radius
            );
        }
    }

    #[test]
    fn projection_inside_ball_is_identity(
        w in matrix_strategy(),
        axis in axis_strategy(),
        slack in 1.01f32..3.0,
    ) {
        for kind in KINDS {
            let radius = ball_norm(&w, axis, kind) * slack + 1e-3;
            let p = project(&w, radius, axis, kind).expect("valid input");
            prop_assert_eq!(&p, &w, "{:?} changed a matrix inside its ball", kind);
        }
    }

    #[test]
    fn projection_preserves_signs(
        w in matrix_strategy(),
        axis in axis_strategy(),
        radius in 0.1f32..10.0,
    ) {
        for kind in KINDS {
            let p = project(&w, radius, axis, kind).expect("valid input");
            for (&x, &y) in w.as_slice().iter().zip(p.as_slice()) {
                prop_assert!(y == 0.0 || x.signum() == y.signum(), "{:?}: {} -> {}", kind, x, y);
                prop_assert!(y.abs() <= x.abs() + 1e-6, "{:?}: {} grew to {}", kind, x, y);
            }
        }
    }

    #[test]
    fn larger_radius_never_zeroes_more_groups(
        w in matrix_strategy(),
        axis in axis_strategy(),
        radius in 0.1f32..5.0,
    ) {
        for kind in KINDS {
            let tight = project(&w, radius, axis, kind).expect("valid input");
            let loose = project(&w, radius * 2.0, axis, kind).expect("valid input");
            prop_assert!(
                zero_groups(&loose, axis) <= zero_groups(&tight, axis),
                "{:?}: radius {} zeroed {} groups, radius {} zeroed {}",
                kind, radius, zero_groups(&tight, axis), radius * 2.0, zero_groups(&loose, axis)
            );
        }
    }

    #[test]
    fn projection_keeps_shape(
        w in matrix_strategy(),
        axis in axis_strategy(),
        radius in 0.1f32..10.0,
    ) {
        for kind in KINDS {
            let p = project(&w, radius, axis, kind).expect("valid input");
            prop_assert_eq!(p.shape(), w.shape());
        }
    }
}
