//! Population-structure view: leading eigenvectors as principal components.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::spectral::SpectralDecomposition;

/// Top-k principal components of the kinship matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalComponents {
    pub sample_ids: Vec<String>,
    /// "PC1", "PC2", ...
    pub labels: Vec<String>,
    pub eigenvalues: Vec<f64>,
    /// Share of the total non-negative eigenvalue mass per component.
    pub variance_explained: Vec<f64>,
    /// `scores[k][i]` = entry i of eigenvector k.
    pub scores: Vec<Vec<f64>>,
}

impl PrincipalComponents {
    /// Take the `k` leading components (fewer if the matrix is smaller).
    pub fn from_decomposition(sd: &SpectralDecomposition, k: usize) -> Self {
        let k = k.min(sd.len());
        let total: f64 = sd.values().iter().map(|&v| v.max(0.0)).sum();
        let eigenvalues: Vec<f64> = sd.values()[..k].to_vec();
        let variance_explained = eigenvalues
            .iter()
            .map(|&v| if total > 0.0 { v.max(0.0) / total } else { 0.0 })
            .collect();

        Self {
            sample_ids: sd.sample_ids().to_vec(),
            labels: (1..=k).map(|c| format!("PC{}", c)).collect(),
            eigenvalues,
            variance_explained,
            scores: (0..k).map(|c| sd.eigenvector(c)).collect(),
        }
    }

    pub fn n_components(&self) -> usize {
        self.labels.len()
    }

    /// Scores of one sample across all components.
    pub fn sample_scores(&self, i: usize) -> Vec<f64> {
        self.scores.iter().map(|pc| pc[i]).collect()
    }

    /// Per-sample scores: `IID PC1 PC2 ...`.
    pub fn write_scores<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "IID")?;
        for l in &self.labels {
            write!(out, "\t{}", l)?;
        }
        writeln!(out)?;
        for (i, id) in self.sample_ids.iter().enumerate() {
            write!(out, "{}", id)?;
            for pc in &self.scores {
                write!(out, "\t{:.6e}", pc[i])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Per-component summary: `PC eigenvalue variance_explained`.
    pub fn write_eigenvalues<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "PC\teigenvalue\tvariance_explained")?;
        for ((l, v), share) in self
            .labels
            .iter()
            .zip(&self.eigenvalues)
            .zip(&self.variance_explained)
        {
            writeln!(out, "{}\t{:.6e}\t{:.6}", l, v, share)?;
        }
        Ok(())
    }
}
