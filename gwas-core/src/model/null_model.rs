//! NullModel: everything the per-marker mixed-model test needs, so a scan
//! can run against a saved fit without recomputing kinship or REML.

use serde::{Deserialize, Serialize};

use crate::error::{GwasError, Result};
use crate::lmm::VarianceComponents;

/// The fitted null model, serialized to .gwas.model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullModel {
    /// Magic bytes for validation.
    pub magic: [u8; 4],
    /// Version number for forward compatibility.
    pub version: u32,
    /// Sample IDs in model order.
    pub sample_ids: Vec<String>,
    /// Phenotype, row-aligned with `sample_ids`.
    pub phenotype: Vec<f64>,
    pub variance_components: VarianceComponents,
    /// Repaired kinship eigenvalues, descending.
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as flat col-major (n x n).
    pub eigenvectors: Vec<f64>,
    /// Eigenvalues below this were clamped to zero.
    pub zero_tolerance: f64,
}

impl NullModel {
    /// Magic bytes: "GWMD".
    pub const MAGIC: [u8; 4] = [b'G', b'W', b'M', b'D'];
    /// Current model version.
    pub const VERSION: u32 = 1;

    pub fn new(
        sample_ids: Vec<String>,
        phenotype: Vec<f64>,
        variance_components: VarianceComponents,
        eigenvalues: Vec<f64>,
        eigenvectors: Vec<f64>,
        zero_tolerance: f64,
    ) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            sample_ids,
            phenotype,
            variance_components,
            eigenvalues,
            eigenvectors,
            zero_tolerance,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Check header and internal dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.magic != Self::MAGIC {
            return Err(GwasError::Alignment(format!(
                "invalid model: expected magic bytes {:?}, got {:?}",
                Self::MAGIC,
                self.magic
            )));
        }
        if self.version != Self::VERSION {
            return Err(GwasError::Alignment(format!(
                "unsupported model version {} (expected {})",
                self.version,
                Self::VERSION
            )));
        }
        let n = self.n_samples();
        if self.phenotype.len() != n
            || self.eigenvalues.len() != n
            || self.eigenvectors.len() != n * n
        {
            return Err(GwasError::Alignment(format!(
                "model for {} samples has {} phenotype values, {} eigenvalues and {} eigenvector entries",
                n,
                self.phenotype.len(),
                self.eigenvalues.len(),
                self.eigenvectors.len()
            )));
        }
        let vc = &self.variance_components;
        if !(vc.delta.is_finite() && vc.delta > 0.0 && vc.sigma_g2.is_finite()) {
            return Err(GwasError::NumericalInstability(format!(
                "model has invalid variance components (delta = {}, sigma_g2 = {})",
                vc.delta, vc.sigma_g2
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> NullModel {
        NullModel::new(
            vec!["S1".into(), "S2".into()],
            vec![0.5, -0.5],
            VarianceComponents {
                sigma_g2: 0.8,
                sigma_e2: 0.4,
                delta: 0.5,
                h2: 2.0 / 3.0,
                reml_log_likelihood: -3.2,
            },
            vec![1.5, 0.5],
            vec![1.0, 0.0, 0.0, 1.0],
            1e-8,
        )
    }

    #[test]
    fn test_validate_ok() {
        assert!(small_model().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_magic_and_dims() {
        let mut m = small_model();
        m.magic = *b"XXXX";
        assert!(matches!(m.validate(), Err(GwasError::Alignment(_))));

        let mut m = small_model();
        m.eigenvectors.pop();
        assert!(matches!(m.validate(), Err(GwasError::Alignment(_))));

        let mut m = small_model();
        m.variance_components.delta = f64::NAN;
        assert!(matches!(
            m.validate(),
            Err(GwasError::NumericalInstability(_))
        ));
    }
}
