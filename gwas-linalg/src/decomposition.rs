#![allow(clippy::needless_range_loop)]
//! Matrix decompositions.
//!
//! Cholesky factorisation for the small generalised least squares systems
//! of the association tests, and a symmetric eigendecomposition (faer) used
//! to diagonalise the kinship matrix.

use faer::Side;
use thiserror::Error;

use crate::dense::DenseMatrix;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("Singular matrix encountered")]
    SingularMatrix,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Symmetric eigendecomposition did not converge")]
    EigenNotConverged,
}

/// Result of a Cholesky decomposition.
pub struct CholeskyDecomp {
    /// Lower triangular factor L such that A = L * L'.
    pub l: DenseMatrix,
}

impl CholeskyDecomp {
    /// Compute the Cholesky decomposition of a symmetric positive definite matrix.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }
        let mut l = DenseMatrix::zeros(n, n);

        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l.get(j, k) * l.get(j, k);
            }
            let diag = a.get(j, j) - sum;
            if diag <= 0.0 || !diag.is_finite() {
                return Err(LinalgError::NotPositiveDefinite);
            }
            l.set(j, j, diag.sqrt());

            for i in (j + 1)..n {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l.get(i, k) * l.get(j, k);
                }
                l.set(i, j, (a.get(i, j) - sum) / l.get(j, j));
            }
        }

        Ok(CholeskyDecomp { l })
    }

    /// Forward substitution: solve L * y = b.
    ///
    /// Applying L^{-1} to every column of a GLS problem turns it into an
    /// ordinary least squares problem with identity covariance.
    pub fn whiten(&self, b: &[f64]) -> Vec<f64> {
        let n = self.l.nrows();
        assert_eq!(b.len(), n);
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += self.l.get(i, j) * y[j];
            }
            y[i] = (b[i] - sum) / self.l.get(i, i);
        }
        y
    }
}

/// Eigendecomposition of a symmetric matrix, A = V * diag(values) * V'.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues in non-increasing order.
    pub values: Vec<f64>,
    /// Orthonormal eigenvectors, column k paired with `values[k]`.
    pub vectors: DenseMatrix,
}

impl SymmetricEigen {
    /// Decompose a symmetric matrix. Only the lower triangle is read.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }

        let evd = a
            .as_faer()
            .self_adjoint_eigen(Side::Lower)
            .map_err(|_| LinalgError::EigenNotConverged)?;
        let s = evd.S().column_vector();
        let u = evd.U();

        // faer returns ascending order; flip to descending and carry the
        // eigenvector columns along so pairs stay intact.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| s[j].total_cmp(&s[i]));

        let values: Vec<f64> = order.iter().map(|&k| s[k]).collect();
        let vectors = DenseMatrix::from_fn(n, n, |i, j| u[(i, order[j])]);

        Ok(Self { values, vectors })
    }

    /// Reconstruct V * diag(values) * V'.
    pub fn reconstruct(&self) -> DenseMatrix {
        reconstruct_from_parts(&self.vectors, &self.values)
    }
}

/// V * diag(values) * V' with an exactly symmetric result.
pub fn reconstruct_from_parts(vectors: &DenseMatrix, values: &[f64]) -> DenseMatrix {
    let n = vectors.nrows();
    assert_eq!(values.len(), vectors.ncols());
    let scaled = DenseMatrix::from_fn(n, values.len(), |i, k| vectors.get(i, k) * values[k]);
    let mut out = scaled.mat_mul(&vectors.transpose());
    out.symmetrize();
    out
}

/// Compute eigenvalues of a symmetric matrix, sorted in descending order.
pub fn symmetric_eigenvalues(a: &DenseMatrix) -> Result<Vec<f64>, LinalgError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }
    let mut evals = a
        .as_faer()
        .self_adjoint_eigenvalues(Side::Lower)
        .map_err(|_| LinalgError::EigenNotConverged)?;
    evals.sort_by(|a, b| b.total_cmp(a));
    Ok(evals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky() {
        // A = [[4, 2], [2, 3]]
        let a = DenseMatrix::from_row_major(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let chol = CholeskyDecomp::new(&a).unwrap();
        // L should be [[2, 0], [1, sqrt(2)]]
        assert!((chol.l.get(0, 0) - 2.0).abs() < 1e-10);
        assert!((chol.l.get(1, 0) - 1.0).abs() < 1e-10);
        assert!((chol.l.get(1, 1) - 2.0f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_whiten_gives_identity_covariance() {
        // L^{-1} A L^{-T} = I
        let a = DenseMatrix::from_row_major(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let chol = CholeskyDecomp::new(&a).unwrap();
        let w0 = chol.whiten(&[1.0, 0.0]);
        let w1 = chol.whiten(&[0.0, 1.0]);
        // columns of L^{-1}; check L^{-1} A L^{-T}
        let linv = DenseMatrix::from_col_major(2, 2, vec![w0[0], w0[1], w1[0], w1[1]]);
        let prod = linv.mat_mul(&a).mat_mul(&linv.transpose());
        assert!(prod.max_abs_diff(&DenseMatrix::identity(2)) < 1e-10);
    }

    #[test]
    fn test_cholesky_not_pd() {
        let a = DenseMatrix::from_row_major(2, 2, &[1.0, 3.0, 3.0, 1.0]);
        assert_eq!(
            CholeskyDecomp::new(&a).err(),
            Some(LinalgError::NotPositiveDefinite)
        );
    }

    #[test]
    fn test_eigenvalues() {
        let a = DenseMatrix::from_row_major(2, 2, &[3.0, 1.0, 1.0, 3.0]);
        let evals = symmetric_eigenvalues(&a).unwrap();
        assert!((evals[0] - 4.0).abs() < 1e-10);
        assert!((evals[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_eigen_pairs_descending_and_orthonormal() {
        let a = DenseMatrix::from_row_major(
            3,
            3,
            &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0],
        );
        let eig = SymmetricEigen::new(&a).unwrap();
        assert!(eig.values.windows(2).all(|w| w[0] >= w[1]));

        // A v_k = lambda_k v_k
        for k in 0..3 {
            let v = eig.vectors.col(k);
            let av = a.mat_vec(&v);
            for i in 0..3 {
                assert!((av[i] - eig.values[k] * v[i]).abs() < 1e-10);
            }
        }

        let vtv = eig.vectors.transpose().mat_mul(&eig.vectors);
        assert!(vtv.max_abs_diff(&DenseMatrix::identity(3)) < 1e-10);
        assert!(eig.reconstruct().max_abs_diff(&a) < 1e-10);
    }

    #[test]
    fn test_eigen_rejects_non_square() {
        let a = DenseMatrix::zeros(2, 3);
        assert!(matches!(
            SymmetricEigen::new(&a),
            Err(LinalgError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }
}
