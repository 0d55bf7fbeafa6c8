//! Genomic relationship (kinship) matrix.
//!
//! GCTA-style estimator with per-pair normalisation:
//!
//!   z_ij = (g_ij - 2 p_j) / sqrt(2 p_j (1 - p_j))
//!   K[i,k] = sum_j z_ij z_kj / #{j : g_ij and g_kj both observed}
//!
//! Missing calls contribute to neither the numerator nor the pair count.
//! Markers with p_j of exactly 0 or 1 are skipped. Rows are accumulated in
//! parallel over the upper triangle and mirrored, so the result is exactly
//! symmetric.

use std::io::Write;

use gwas_geno::{GenotypeMatrix, MISSING};
use gwas_linalg::DenseMatrix;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{GwasError, Result};
use crate::qc::allele_frequency;

/// Symmetric n x n relatedness matrix with sample labels.
#[derive(Debug, Clone)]
pub struct KinshipMatrix {
    sample_ids: Vec<String>,
    matrix: DenseMatrix,
    n_markers: usize,
}

impl KinshipMatrix {
    /// Wrap an existing matrix. It must be square, match the labels, and be
    /// symmetric up to rounding (it is then made exactly symmetric).
    pub fn from_matrix(sample_ids: Vec<String>, mut matrix: DenseMatrix) -> Result<Self> {
        let n = sample_ids.len();
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(GwasError::Alignment(format!(
                "kinship matrix is {}x{} but {} sample IDs were given",
                matrix.nrows(),
                matrix.ncols(),
                n
            )));
        }
        let scale = matrix.frobenius_norm().max(1.0);
        let asym = matrix.max_asymmetry();
        if asym > 1e-10 * scale {
            return Err(GwasError::DegenerateInput(format!(
                "kinship matrix is not symmetric (max |K - K'| = {:.3e})",
                asym
            )));
        }
        matrix.symmetrize();
        Ok(Self {
            sample_ids,
            matrix,
            n_markers: 0,
        })
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Markers that contributed to the estimate (0 if built from a matrix).
    pub fn n_markers(&self) -> usize {
        self.n_markers
    }

    pub fn get(&self, i: usize, k: usize) -> f64 {
        self.matrix.get(i, k)
    }

    /// Write as a labelled square TSV.
    pub fn write_tsv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write_labelled_matrix(out, &self.sample_ids, &self.matrix)
    }
}

/// Write a square matrix with sample IDs as the header row and first column.
pub fn write_labelled_matrix<W: Write>(
    out: &mut W,
    ids: &[String],
    m: &DenseMatrix,
) -> std::io::Result<()> {
    write!(out, "IID")?;
    for id in ids {
        write!(out, "\t{}", id)?;
    }
    writeln!(out)?;
    for (i, id) in ids.iter().enumerate() {
        write!(out, "{}", id)?;
        for k in 0..ids.len() {
            write!(out, "\t{:.6}", m.get(i, k))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Standardised genotypes, sample-major, with an observation mask.
struct Standardized {
    /// `z[i]` holds z_ij for every usable marker j, 0 where missing.
    z: Vec<Vec<f64>>,
    /// `observed[i][j]` is 1.0 where the call is present.
    observed: Vec<Vec<f64>>,
    n_markers: usize,
}

fn standardize(genotypes: &GenotypeMatrix) -> Standardized {
    let n = genotypes.n_samples();
    let mut z = vec![Vec::new(); n];
    let mut observed = vec![Vec::new(); n];
    let mut n_markers = 0;

    for j in 0..genotypes.n_markers() {
        let codes = genotypes.marker(j);
        let p = match allele_frequency(codes) {
            Some(p) if p > 0.0 && p < 1.0 => p,
            _ => continue,
        };
        let mean = 2.0 * p;
        let sd = (2.0 * p * (1.0 - p)).sqrt();
        for (i, &c) in codes.iter().enumerate() {
            if c == MISSING {
                z[i].push(0.0);
                observed[i].push(0.0);
            } else {
                z[i].push((c as f64 - mean) / sd);
                observed[i].push(1.0);
            }
        }
        n_markers += 1;
    }

    Standardized {
        z,
        observed,
        n_markers,
    }
}

/// Estimate the kinship matrix from QC'd genotypes.
pub fn estimate_kinship(genotypes: &GenotypeMatrix) -> Result<KinshipMatrix> {
    let n = genotypes.n_samples();
    if n < 2 {
        return Err(GwasError::DegenerateInput(format!(
            "kinship needs at least 2 samples, got {}",
            n
        )));
    }

    let std = standardize(genotypes);
    if std.n_markers == 0 {
        return Err(GwasError::DegenerateInput(format!(
            "no polymorphic markers among {} for kinship estimation",
            genotypes.n_markers()
        )));
    }
    info!(
        "Computing kinship: {} samples x {} markers ({} monomorphic skipped)",
        n,
        std.n_markers,
        genotypes.n_markers() - std.n_markers
    );

    // Upper triangle, row i holds entries (i, i..n).
    let upper: Vec<Vec<(f64, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let (zi, oi) = (&std.z[i], &std.observed[i]);
            (i..n)
                .map(|k| {
                    let num = DenseMatrix::dot(zi, &std.z[k]);
                    let cnt = DenseMatrix::dot(oi, &std.observed[k]);
                    (num, cnt)
                })
                .collect()
        })
        .collect();

    let mut matrix = DenseMatrix::zeros(n, n);
    let mut empty_pairs = 0usize;
    for (i, row) in upper.iter().enumerate() {
        for (offset, &(num, cnt)) in row.iter().enumerate() {
            let k = i + offset;
            let v = if cnt > 0.0 {
                num / cnt
            } else {
                empty_pairs += 1;
                0.0
            };
            matrix.set(i, k, v);
            matrix.set(k, i, v);
        }
    }
    if empty_pairs > 0 {
        warn!(
            "{} sample pair(s) share no observed markers; their kinship is set to 0",
            empty_pairs
        );
    }

    Ok(KinshipMatrix {
        sample_ids: genotypes.sample_ids().to_vec(),
        matrix,
        n_markers: std.n_markers,
    })
}
