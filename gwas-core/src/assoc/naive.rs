//! Naive per-marker linear regression, ignoring relatedness.
//!
//! Fits y ~ 1 + g by ordinary least squares for each marker independently.
//! Kept as a baseline: under population structure its false-positive rate
//! is inflated, which the mixed model corrects.

use gwas_geno::GenotypeMatrix;
use rayon::prelude::*;
use tracing::info;

use super::report::{GwasMethod, GwasReport};
use super::{
    check_marker_codes, fit_two_column, screen_marker, AssocConfig, AssociationResult,
    MarkerOutcome,
};
use crate::error::{GwasError, Result};

/// Ordinary least squares association baseline.
#[derive(Debug, Clone)]
pub struct NaiveLinearGwas {
    phenotype: Vec<f64>,
    config: AssocConfig,
}

impl NaiveLinearGwas {
    pub fn new(phenotype: Vec<f64>, config: AssocConfig) -> Self {
        Self { phenotype, config }
    }

    /// Test one marker given its codes (row-aligned with the phenotype).
    /// Returns the samples used, their allele frequency and the outcome.
    pub fn test_marker(&self, codes: &[u8]) -> Result<(usize, Option<f64>, MarkerOutcome)> {
        check_marker_codes(codes, self.phenotype.len())?;
        let (screened, reason) = screen_marker(codes, &self.config);
        if let Some(reason) = reason {
            return Ok((screened.n_obs(), screened.af, MarkerOutcome::Untestable(reason)));
        }
        let y: Vec<f64> = screened.observed.iter().map(|&i| self.phenotype[i]).collect();
        let x = vec![1.0; y.len()];
        let outcome = fit_two_column(&x, &screened.dosages, &y, None);
        Ok((screened.n_obs(), screened.af, outcome))
    }

    /// Test every marker in parallel; output order follows the input.
    pub fn run(&self, genotypes: &GenotypeMatrix) -> Result<GwasReport> {
        if genotypes.n_samples() != self.phenotype.len() {
            return Err(GwasError::Alignment(format!(
                "genotype matrix has {} samples but the phenotype has {}",
                genotypes.n_samples(),
                self.phenotype.len()
            )));
        }
        info!(
            "Naive linear scan: {} markers x {} samples",
            genotypes.n_markers(),
            genotypes.n_samples()
        );

        let results = (0..genotypes.n_markers())
            .into_par_iter()
            .map(|j| {
                let (n_obs, af, outcome) = self.test_marker(genotypes.marker(j))?;
                Ok(AssociationResult {
                    marker: genotypes.markers()[j].clone(),
                    n_obs,
                    af,
                    outcome,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GwasReport::new(GwasMethod::Naive, results, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assoc::UntestableReason;
    use gwas_geno::{MarkerInfo, MISSING};

    #[test]
    fn test_naive_matches_hand_ols() {
        // g = [0, 1, 2, 1], y = [1, 2, 4, 3]
        // gbar = 1, ybar = 2.5, Sgg = 2, Sgy = 3 -> beta = 1.5
        let gwas = NaiveLinearGwas::new(vec![1.0, 2.0, 4.0, 3.0], AssocConfig::default());
        let (n, af, outcome) = gwas.test_marker(&[0, 1, 2, 1]).unwrap();
        assert_eq!(n, 4);
        assert_eq!(af, Some(0.5));
        let t = match outcome {
            MarkerOutcome::Tested(t) => t,
            other => panic!("unexpected {:?}", other),
        };
        assert!((t.beta - 1.5).abs() < 1e-12);
        // residuals: y - (1 + 1.5 g) = [0, -0.5, 0, 0.5] -> rss = 0.5, s2 = 0.25
        // se = sqrt(s2 / Sgg) = sqrt(0.125)
        assert!((t.se - 0.125f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_missing_sample_dropped_for_marker_only() {
        let y = vec![1.0, 2.0, 4.0, 3.0, 100.0];
        let gwas = NaiveLinearGwas::new(y, AssocConfig::default());
        let (n, _, with_missing) = gwas.test_marker(&[0, 1, 2, 1, MISSING]).unwrap();
        assert_eq!(n, 4);
        let (_, _, reference) =
            NaiveLinearGwas::new(vec![1.0, 2.0, 4.0, 3.0], AssocConfig::default())
                .test_marker(&[0, 1, 2, 1])
                .unwrap();
        assert_eq!(with_missing, reference);
    }

    #[test]
    fn test_marker_rejects_bad_codes_and_length() {
        let gwas = NaiveLinearGwas::new(vec![1.0, 2.0, 4.0, 3.0], AssocConfig::default());
        assert!(matches!(
            gwas.test_marker(&[0, 1, 3, 1]),
            Err(GwasError::DegenerateInput(_))
        ));
        assert!(matches!(
            gwas.test_marker(&[0, 1, 2, 1, 0]),
            Err(GwasError::Alignment(_))
        ));
        assert!(matches!(
            gwas.test_marker(&[0, 1, 2]),
            Err(GwasError::Alignment(_))
        ));
    }

    #[test]
    fn test_run_keeps_every_marker() {
        let g = GenotypeMatrix::from_sample_rows(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec![
                MarkerInfo::new("m1", "1", 10),
                MarkerInfo::new("m2", "1", 20),
            ],
            &[
                vec![Some(0), Some(1)],
                vec![Some(1), Some(1)],
                vec![Some(2), Some(1)],
                vec![Some(1), Some(1)],
            ],
        )
        .unwrap();
        let report = NaiveLinearGwas::new(vec![0.5, 1.0, 2.2, 1.1], AssocConfig::default())
            .run(&g)
            .unwrap();
        assert_eq!(report.results().len(), 2);
        assert!(report.results()[0].is_tested());
        assert_eq!(
            report.results()[1].untestable_reason(),
            Some(UntestableReason::Monomorphic)
        );
        assert_eq!(report.n_tested(), 1);
    }

    #[test]
    fn test_run_rejects_misaligned_phenotype() {
        let g = GenotypeMatrix::from_sample_rows(
            vec!["A".into(), "B".into()],
            vec![MarkerInfo::new("m1", "1", 10)],
            &[vec![Some(0)], vec![Some(1)]],
        )
        .unwrap();
        let gwas = NaiveLinearGwas::new(vec![1.0, 2.0, 3.0], AssocConfig::default());
        assert!(matches!(gwas.run(&g), Err(GwasError::Alignment(_))));
    }
}
