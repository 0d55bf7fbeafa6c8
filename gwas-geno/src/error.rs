//! Data-model invariant violations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenoError {
    #[error("Invalid dosage code {code} for sample {sample} at marker {marker} (expected 0, 1, 2 or missing)")]
    InvalidDosage {
        sample: usize,
        marker: usize,
        code: u8,
    },

    #[error("Duplicate {kind} identifier '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Index {index} out of range for {what} (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}
