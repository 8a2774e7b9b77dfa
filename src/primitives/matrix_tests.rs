pub(crate) use super::*;

#[test]
fn test_from_vec() {
    let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .expect("test data has correct dimensions: 2*3=6 elements");
    assert_eq!(m.shape(), (2, 3));
    assert!((m.get(0, 0) - 1.0).abs() < 1e-6);
    assert!((m.get(1, 2) - 6.0).abs() < 1e-6);
}

#[test]
fn test_from_vec_error() {
    let result = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0]);
    assert!(result.is_err());
}

#[test]
fn test_from_rows() {
    let m = Matrix::from_rows(&[vec![3.0, 0.0, 1.0], vec![0.0, 2.0, 0.0]])
        .expect("rectangular rows");
    assert_eq!(m.shape(), (2, 3));
    assert!((m.get(1, 1) - 2.0).abs() < 1e-6);

    let ragged = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
    assert!(ragged.is_err());
}

#[test]
fn test_zeros() {
    let m = Matrix::zeros(2, 3);
    assert_eq!(m.shape(), (2, 3));
    assert!(m.as_slice().iter().all(|&x| x == 0.0));
}

#[test]
fn test_transpose() {
    let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .expect("test data has correct dimensions: 2*3=6 elements");
    let t = m.transpose();
    assert_eq!(t.shape(), (3, 2));
    assert!((t.get(0, 0) - 1.0).abs() < 1e-6);
    assert!((t.get(0, 1) - 4.0).abs() < 1e-6);
    assert!((t.get(2, 1) - 6.0).abs() < 1e-6);
}

#[test]
fn test_row_and_column() {
    let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0])
        .expect("test data has correct dimensions: 2*3=6 elements");
    assert_eq!(m.row(1).as_slice(), &[4.0, 5.0, 6.0]);
    assert_eq!(m.column(2).as_slice(), &[3.0, 6.0]);
    assert_eq!(m.row_slice(0), &[1.0, 2.0, 3.0]);
}

#[test]
fn test_matmul() {
    let a = Matrix::from_vec(2, 2, vec![1.0_f32, 2.0, 3.0, 4.0]).expect("2x2");
    let b = Matrix::from_vec(2, 2, vec![5.0_f32, 6.0, 7.0, 8.0]).expect("2x2");
    let c = a.matmul(&b).expect("compatible shapes");
    assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
}

#[test]
fn test_matmul_dimension_error() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(2, 3);
    assert!(a.matmul(&b).is_err());
}

#[test]
fn test_matmul_transposed_matches_explicit_transpose() {
    let x = Matrix::from_vec(2, 3, vec![1.0_f32, -2.0, 0.5, 3.0, 0.0, -1.0]).expect("2x3");
    let w = Matrix::from_vec(4, 3, (0..12).map(|i| i as f32 * 0.25 - 1.0).collect())
        .expect("4x3");
    let fast = x.matmul_transposed(&w).expect("cols agree");
    let slow = x.matmul(&w.transpose()).expect("cols agree");
    assert_eq!(fast.shape(), (2, 4));
    for (a, b) in fast.as_slice().iter().zip(slow.as_slice()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn test_transpose_matmul_matches_explicit_transpose() {
    let d = Matrix::from_vec(3, 2, vec![1.0_f32, 2.0, 0.0, -1.0, 4.0, 0.5]).expect("3x2");
    let x = Matrix::from_vec(3, 4, (0..12).map(|i| i as f32 - 5.0).collect()).expect("3x4");
    let fast = d.transpose_matmul(&x).expect("rows agree");
    let slow = d.transpose().matmul(&x).expect("rows agree");
    assert_eq!(fast.shape(), (2, 4));
    for (a, b) in fast.as_slice().iter().zip(slow.as_slice()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn test_transpose_matmul_row_mismatch() {
    let d = Matrix::zeros(3, 2);
    let x = Matrix::zeros(4, 2);
    assert!(d.transpose_matmul(&x).is_err());
}

#[test]
fn test_select_rows() {
    let m = Matrix::from_vec(3, 2, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("3x2");
    let s = m.select_rows(&[2, 0]);
    assert_eq!(s.shape(), (2, 2));
    assert_eq!(s.as_slice(), &[5.0, 6.0, 1.0, 2.0]);
}

#[test]
fn test_mul_scalar() {
    let m = Matrix::from_vec(1, 3, vec![1.0_f32, -2.0, 3.0]).expect("1x3");
    assert_eq!(m.mul_scalar(2.0).as_slice(), &[2.0, -4.0, 6.0]);
}

#[test]
fn test_set() {
    let mut m = Matrix::zeros(2, 2);
    m.set(1, 0, 7.5);
    assert!((m.get(1, 0) - 7.5).abs() < 1e-6);
}

#[test]
fn test_is_finite_and_near_zero() {
    let mut m = Matrix::from_vec(1, 4, vec![0.0_f32, 1e-4, -0.5, 2.0]).expect("1x4");
    assert!(m.is_finite());
    assert_eq!(m.count_near_zero(1e-3), 2);
    m.set(0, 3, f32::NAN);
    assert!(!m.is_finite());
}
