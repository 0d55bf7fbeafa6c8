//! gwas-linalg: Linear algebra wrappers for gwas-rs
//!
//! Provides the dense matrix type, Cholesky and symmetric eigen
//! decompositions, and the one-dimensional optimizer used to fit
//! variance components in the kinship eigenbasis.

pub mod decomposition;
pub mod dense;
pub mod optimize;

pub use decomposition::{CholeskyDecomp, LinalgError, SymmetricEigen};
pub use dense::DenseMatrix;
pub use optimize::{GridBrentConfig, Maximum, OptimizeError};
