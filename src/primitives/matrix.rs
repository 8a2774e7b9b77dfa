//! Matrix type for 2D numeric data.

use super::Vector;
use crate::error::{Result, SparseError};
use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// Weight matrices follow the `[out_features, in_features]` convention, so
/// column `j` of an input layer's weight holds every connection leaving
/// input feature `j`.
///
/// # Examples
///
/// ```
/// use sparse_fcnn::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
///     .expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SparseError::dimension_mismatch(
                "rows * cols",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Returns true if the matrix holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrows a row as a slice.
    #[must_use]
    pub fn row_slice(&self, row_idx: usize) -> &[T] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Mutably borrows a row as a slice.
    pub fn row_slice_mut(&mut self, row_idx: usize) -> &mut [T] {
        let start = row_idx * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        Vector::from_slice(self.row_slice(row_idx))
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Gathers the given rows, in order, into a new matrix.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row_slice(i));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl Matrix<f32> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates a matrix of ones.
    #[must_use]
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![1.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Builds a matrix from nested rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(SparseError::dimension_mismatch("row length", cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Transposes the matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix-matrix multiplication `self · other`.
    ///
    /// # Errors
    ///
    /// Returns an error if dimensions don't match.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(SparseError::shape_mismatch(
                (self.cols, other.cols),
                other.shape(),
            ));
        }

        let mut result = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            let out = &mut result[i * other.cols..(i + 1) * other.cols];
            for (k, &a) in self.row_slice(i).iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in out.iter_mut().zip(other.row_slice(k)) {
                    *o += a * b;
                }
            }
        }

        Ok(Self {
            data: result,
            rows: self.rows,
            cols: other.cols,
        })
    }

    /// Multiplication by the transpose of `other`: `self · otherᵀ`.
    ///
    /// This is the linear-layer product `x · Wᵀ` without materialising `Wᵀ`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column counts differ.
    pub fn matmul_transposed(&self, other: &Self) -> Result<Self> {
        if self.cols != other.cols {
            return Err(SparseError::shape_mismatch(
                (other.rows, self.cols),
                other.shape(),
            ));
        }

        let mut result = Vec::with_capacity(self.rows * other.rows);
        for i in 0..self.rows {
            let a = self.row_slice(i);
            for j in 0..other.rows {
                let dot: f32 = a.iter().zip(other.row_slice(j)).map(|(x, y)| x * y).sum();
                result.push(dot);
            }
        }

        Ok(Self {
            data: result,
            rows: self.rows,
            cols: other.rows,
        })
    }

    /// Multiplication of the transpose of `self` by `other`: `selfᵀ · other`.
    ///
    /// Used for weight gradients `δᵀ · x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row counts differ.
    pub fn transpose_matmul(&self, other: &Self) -> Result<Self> {
        if self.rows != other.rows {
            return Err(SparseError::dimension_mismatch(
                "rows",
                self.rows,
                other.rows,
            ));
        }

        let mut result = vec![0.0; self.cols * other.cols];
        for r in 0..self.rows {
            let b = other.row_slice(r);
            for (i, &a) in self.row_slice(r).iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let out = &mut result[i * other.cols..(i + 1) * other.cols];
                for (o, &v) in out.iter_mut().zip(b) {
                    *o += a * v;
                }
            }
        }

        Ok(Self {
            data: result,
            rows: self.cols,
            cols: other.cols,
        })
    }

    /// Multiplies each element by a scalar.
    #[must_use]
    pub fn mul_scalar(&self, scalar: f32) -> Self {
        self.map(|x| x * scalar)
    }

    /// Applies `f` to every element.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            data: self.data.iter().map(|&x| f(x)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Returns true if every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Counts elements with `|x| <= tol`.
    #[must_use]
    pub fn count_near_zero(&self, tol: f32) -> usize {
        self.data.iter().filter(|x| x.abs() <= tol).count()
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
