//! Core compute primitives (Vector, Matrix).
//!
//! Every algorithm in the crate is written against these two types, so the
//! numerics stay backend-agnostic.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
