//! End-to-end run: QC -> kinship -> spectral repair -> PCs -> null model ->
//! mixed-model and naive scans. [`run_naive_pipeline`] stops after QC and
//! runs the naive scan alone.
//!
//! Every stage consumes the previous stage's output by reference and
//! returns a new value; nothing is mutated after it is produced.

use gwas_geno::{GenotypeMatrix, PhenotypeVector};
use tracing::info;

use crate::assoc::naive::NaiveLinearGwas;
use crate::assoc::report::GwasReport;
use crate::assoc::AssocConfig;
use crate::error::Result;
use crate::kinship::{estimate_kinship, KinshipMatrix};
use crate::lmm::{MixedModelGwas, RemlConfig};
use crate::pca::PrincipalComponents;
use crate::qc::{run_qc, QcConfig, QcOutput};
use crate::spectral::{SpectralConfig, SpectralDecomposition};

/// All stage configurations in one place.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub qc: QcConfig,
    pub spectral: SpectralConfig,
    pub reml: RemlConfig,
    pub assoc: AssocConfig,
    /// Principal components to report.
    pub n_pcs: usize,
    /// Family-wise error rate for the Bonferroni threshold.
    pub alpha: f64,
    /// Also run the naive OLS scan.
    pub run_naive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            qc: QcConfig::default(),
            spectral: SpectralConfig::default(),
            reml: RemlConfig::default(),
            assoc: AssocConfig::default(),
            n_pcs: 10,
            alpha: 0.05,
            run_naive: true,
        }
    }
}

/// Every intermediate product of a run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub qc: QcOutput,
    /// Raw GCTA kinship.
    pub kinship: KinshipMatrix,
    /// Unclamped eigendecomposition of `kinship`.
    pub decomposition: SpectralDecomposition,
    pub pcs: PrincipalComponents,
    /// Null model on the repaired kinship.
    pub model: MixedModelGwas,
    pub mixed: GwasReport,
    pub naive: Option<GwasReport>,
}

/// Run the whole analysis.
pub fn run_pipeline(
    genotypes: &GenotypeMatrix,
    phenotype: &PhenotypeVector,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let qc = run_qc(genotypes, phenotype, &config.qc)?;
    let kinship = estimate_kinship(&qc.genotypes)?;
    let decomposition = SpectralDecomposition::decompose(&kinship)?;
    let repaired = decomposition.repair(&config.spectral);
    let pcs = PrincipalComponents::from_decomposition(&decomposition, config.n_pcs);

    let model = MixedModelGwas::fit(
        repaired,
        qc.phenotype.clone(),
        &config.reml,
        config.assoc.clone(),
    )?;
    let mixed = model.run(&qc.genotypes)?;
    let naive = if config.run_naive {
        Some(NaiveLinearGwas::new(qc.phenotype.clone(), config.assoc.clone()).run(&qc.genotypes)?)
    } else {
        None
    };

    for report in std::iter::once(&mixed).chain(naive.as_ref()) {
        log_summary(report, config.alpha);
    }

    Ok(PipelineOutput {
        qc,
        kinship,
        decomposition,
        pcs,
        model,
        mixed,
        naive,
    })
}

/// QC followed by the naive scan only. No kinship or null model is
/// estimated, so a variance-component failure cannot abort it.
pub fn run_naive_pipeline(
    genotypes: &GenotypeMatrix,
    phenotype: &PhenotypeVector,
    config: &PipelineConfig,
) -> Result<(QcOutput, GwasReport)> {
    let qc = run_qc(genotypes, phenotype, &config.qc)?;
    let naive =
        NaiveLinearGwas::new(qc.phenotype.clone(), config.assoc.clone()).run(&qc.genotypes)?;
    log_summary(&naive, config.alpha);
    Ok((qc, naive))
}

fn log_summary(report: &GwasReport, alpha: f64) {
    info!(
        "{}: {} tested, {} untestable, Bonferroni threshold {}, {} significant, lambda_GC {}",
        report.method(),
        report.n_tested(),
        report.n_untestable(),
        report
            .bonferroni_threshold(alpha)
            .map_or_else(|| "NA".to_string(), |t| format!("{:.3e}", t)),
        report.significant(alpha).len(),
        report
            .genomic_inflation()
            .map_or_else(|| "NA".to_string(), |l| format!("{:.3}", l)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GwasError;
    use gwas_geno::MarkerInfo;

    fn inputs() -> (GenotypeMatrix, PhenotypeVector) {
        // two families with a shared-ancestry signal
        let rows: Vec<Vec<Option<u8>>> = vec![
            vec![Some(0), Some(1), Some(2), Some(0), Some(1)],
            vec![Some(0), Some(2), Some(2), Some(1), Some(1)],
            vec![Some(1), Some(1), Some(2), Some(0), Some(0)],
            vec![Some(2), Some(0), Some(0), Some(2), Some(1)],
            vec![Some(2), Some(0), Some(1), Some(2), None],
            vec![Some(1), Some(0), Some(0), Some(1), Some(2)],
            vec![Some(0), Some(2), Some(1), Some(0), Some(0)],
            vec![Some(2), Some(1), Some(0), Some(2), Some(2)],
        ];
        let ids: Vec<String> = (0..8).map(|i| format!("S{}", i)).collect();
        let markers = (0..5)
            .map(|j| MarkerInfo::new(format!("m{}", j), "1", 100 * (j as u64 + 1)))
            .collect();
        let g = GenotypeMatrix::from_sample_rows(ids.clone(), markers, &rows).unwrap();
        let y = vec![0.3, 0.9, 0.1, -1.2, -0.7, -0.2, 1.1, -0.9];
        let pheno =
            PhenotypeVector::from_pairs(ids.into_iter().zip(y.into_iter().map(Some))).unwrap();
        (g, pheno)
    }

    #[test]
    fn test_pipeline_produces_aligned_outputs() {
        let (g, pheno) = inputs();
        let config = PipelineConfig {
            n_pcs: 3,
            ..PipelineConfig::default()
        };
        let out = run_pipeline(&g, &pheno, &config).unwrap();
        assert_eq!(out.kinship.n_samples(), 8);
        assert_eq!(out.pcs.n_components(), 3);
        assert_eq!(out.model.sample_ids(), out.qc.genotypes.sample_ids());
        assert_eq!(out.mixed.results().len(), out.qc.genotypes.n_markers());
        let naive = out.naive.unwrap();
        assert_eq!(naive.results().len(), out.qc.genotypes.n_markers());
        for p in out.mixed.p_values().into_iter().chain(naive.p_values()) {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_naive_pipeline_does_not_fit_null_model() {
        let (g, pheno) = inputs();
        // an empty delta grid makes any REML fit fail
        let config = PipelineConfig {
            reml: RemlConfig {
                grid_points: 0,
                ..RemlConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            run_pipeline(&g, &pheno, &config),
            Err(GwasError::NumericalInstability(_))
        ));

        let (qc, naive) = run_naive_pipeline(&g, &pheno, &config).unwrap();
        assert_eq!(naive.results().len(), qc.genotypes.n_markers());
        assert!(naive.variance_components().is_none());
        assert!(naive.n_tested() > 0);
    }

    #[test]
    fn test_pipeline_rejects_unknown_phenotype_sample() {
        let (g, _) = inputs();
        let pheno = PhenotypeVector::from_pairs(vec![
            ("S0".to_string(), Some(1.0)),
            ("ghost".to_string(), Some(2.0)),
        ])
        .unwrap();
        assert!(matches!(
            run_pipeline(&g, &pheno, &PipelineConfig::default()),
            Err(GwasError::Alignment(_))
        ));
    }
}
