//! Eigendecomposition of the kinship matrix and PSD repair.
//!
//! Estimation noise can leave a kinship matrix with small negative
//! eigenvalues. Repair clamps every eigenvalue below the zero tolerance to
//! exactly 0 and rebuilds V diag(lambda) V'. The result, [`RepairedKinship`],
//! can only be obtained through [`SpectralDecomposition::repair`] and is the
//! only kinship representation the mixed model accepts.

use gwas_linalg::decomposition::{reconstruct_from_parts, symmetric_eigenvalues};
use gwas_linalg::{DenseMatrix, SymmetricEigen};
use tracing::{debug, info};

use crate::error::{GwasError, Result};
use crate::kinship::KinshipMatrix;

/// Configuration for the spectral stage.
#[derive(Debug, Clone)]
pub struct SpectralConfig {
    /// Eigenvalues below this (including small positives) are treated as 0.
    pub zero_tolerance: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            zero_tolerance: 1e-8,
        }
    }
}

/// Eigenpairs of a kinship matrix, eigenvalues non-increasing.
#[derive(Debug, Clone)]
pub struct SpectralDecomposition {
    sample_ids: Vec<String>,
    values: Vec<f64>,
    vectors: DenseMatrix,
}

impl SpectralDecomposition {
    /// Decompose a kinship matrix.
    pub fn decompose(kinship: &KinshipMatrix) -> Result<Self> {
        let eig = SymmetricEigen::new(kinship.matrix())?;
        debug!(
            "Kinship spectrum: max {:.4}, min {:.4e}",
            eig.values.first().copied().unwrap_or(0.0),
            eig.values.last().copied().unwrap_or(0.0)
        );
        Ok(Self {
            sample_ids: kinship.sample_ids().to_vec(),
            values: eig.values,
            vectors: eig.vectors,
        })
    }

    /// Rebuild from stored eigenpairs (e.g. a saved null model).
    pub(crate) fn from_parts(
        sample_ids: Vec<String>,
        values: Vec<f64>,
        vectors: DenseMatrix,
    ) -> Result<Self> {
        let n = sample_ids.len();
        if values.len() != n || vectors.nrows() != n || vectors.ncols() != n {
            return Err(GwasError::Alignment(format!(
                "eigendecomposition has {} values and a {}x{} basis for {} samples",
                values.len(),
                vectors.nrows(),
                vectors.ncols(),
                n
            )));
        }
        Ok(Self {
            sample_ids,
            values,
            vectors,
        })
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Eigenvalues, non-increasing.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Orthonormal eigenvectors; column k pairs with `values()[k]`.
    pub fn vectors(&self) -> &DenseMatrix {
        &self.vectors
    }

    /// Eigenvector k as a vector over samples.
    pub fn eigenvector(&self, k: usize) -> Vec<f64> {
        self.vectors.col(k)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// V diag(lambda) V' with the unclamped eigenvalues.
    pub fn reconstruct(&self) -> DenseMatrix {
        reconstruct_from_parts(&self.vectors, &self.values)
    }

    /// Number of eigenvalues below `-tol`.
    pub fn n_negative(&self, tol: f64) -> usize {
        self.values.iter().filter(|&&v| v < -tol).count()
    }

    /// Clamp eigenvalues below the tolerance to 0 and rebuild the matrix.
    pub fn repair(&self, config: &SpectralConfig) -> RepairedKinship {
        let mut n_clamped = 0;
        let mut n_negative = 0;
        let values: Vec<f64> = self
            .values
            .iter()
            .map(|&v| {
                if v < config.zero_tolerance {
                    if v < 0.0 {
                        n_negative += 1;
                    }
                    if v != 0.0 {
                        n_clamped += 1;
                    }
                    0.0
                } else {
                    v
                }
            })
            .collect();

        if n_negative > 0 {
            let most_negative = self.values.iter().copied().fold(0.0f64, f64::min);
            info!(
                "PSD repair: clamped {} eigenvalue(s) to 0 ({} negative, most negative {:.3e})",
                n_clamped, n_negative, most_negative
            );
        } else {
            debug!("PSD repair: clamped {} near-zero eigenvalue(s)", n_clamped);
        }

        let matrix = reconstruct_from_parts(&self.vectors, &values);
        RepairedKinship {
            sample_ids: self.sample_ids.clone(),
            values,
            vectors: self.vectors.clone(),
            matrix,
            n_clamped,
        }
    }
}

/// Positive semi-definite kinship, with its eigenbasis.
#[derive(Debug, Clone)]
pub struct RepairedKinship {
    sample_ids: Vec<String>,
    values: Vec<f64>,
    vectors: DenseMatrix,
    matrix: DenseMatrix,
    n_clamped: usize,
}

impl RepairedKinship {
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Clamped eigenvalues (all >= 0), non-increasing.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn vectors(&self) -> &DenseMatrix {
        &self.vectors
    }

    /// The repaired matrix V diag(lambda_clamped) V'.
    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    /// Eigenvalues that were set to 0.
    pub fn n_clamped(&self) -> usize {
        self.n_clamped
    }

    /// Labelled copy of the repaired matrix.
    pub fn to_kinship(&self) -> Result<KinshipMatrix> {
        KinshipMatrix::from_matrix(self.sample_ids.clone(), self.matrix.clone())
    }
}

/// All eigenvalues of the symmetric matrix `m` are >= `-tol`.
pub fn is_psd(m: &DenseMatrix, tol: f64) -> Result<bool> {
    let values = symmetric_eigenvalues(m)?;
    Ok(values.iter().all(|&v| v >= -tol))
}
