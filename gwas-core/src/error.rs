//! Error taxonomy for a GWAS run.
//!
//! Structural problems abort the run. Per-marker problems are not errors:
//! they are recorded as [`crate::assoc::UntestableReason`] in the results.

use gwas_geno::GenoError;
use gwas_linalg::LinalgError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GwasError {
    /// Sample or marker identifiers cannot be reconciled between inputs.
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Too few samples or markers remain to fit anything meaningful.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// The variance-component search failed; every marker depends on it.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    #[error(transparent)]
    Geno(#[from] GenoError),

    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

pub type Result<T> = std::result::Result<T, GwasError>;
