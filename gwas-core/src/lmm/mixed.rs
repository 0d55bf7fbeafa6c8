//! Mixed-model association with variance components determined once (P3D).
//!
//! The null model y = mu + g + e, g ~ N(0, sigma_g^2 K), is fitted once on
//! the repaired kinship. Every marker is then tested by generalised least
//! squares with the covariance fixed at sigma_g^2 (K + delta I):
//!
//! - complete markers are rotated into the eigenbasis, where the covariance
//!   is diagonal with weights 1 / (lambda_i + delta);
//! - markers with missing calls use only their observed samples S and
//!   whiten by the Cholesky factor of K[S,S] + delta I.
//!
//! Both routes compute the same GLS estimate. The residual scale is
//! re-estimated per marker and the effect is tested with t on n - 2 df.

use gwas_geno::GenotypeMatrix;
use gwas_linalg::CholeskyDecomp;
use gwas_linalg::DenseMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

use super::reml::{estimate_variance_components, RemlConfig, RotatedNull, VarianceComponents};
use crate::assoc::report::{GwasMethod, GwasReport};
use crate::assoc::{
    check_marker_codes, fit_two_column, screen_marker, AssocConfig, AssociationResult,
    MarkerOutcome, UntestableReason,
};
use crate::error::{GwasError, Result};
use crate::model::null_model::NullModel;
use crate::spectral::{RepairedKinship, SpectralConfig, SpectralDecomposition};
use crate::util::math::mean_variance;

/// How a marker's GLS fit is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPath {
    /// Eigenbasis rotation; requires every sample to be observed.
    Rotated,
    /// Cholesky whitening on the observed samples.
    Whitened,
}

/// A fitted null model ready to test markers.
#[derive(Debug, Clone)]
pub struct MixedModelGwas {
    kinship: RepairedKinship,
    phenotype: Vec<f64>,
    /// U'y
    y_rot: Vec<f64>,
    /// U'1
    x_rot: Vec<f64>,
    /// 1 / (lambda_i + delta)
    weights: Vec<f64>,
    variance_components: VarianceComponents,
    config: AssocConfig,
}

impl MixedModelGwas {
    /// Estimate variance components for `phenotype` (row-aligned with the
    /// kinship samples) and freeze them for all later tests.
    pub fn fit(
        kinship: RepairedKinship,
        phenotype: Vec<f64>,
        reml: &RemlConfig,
        config: AssocConfig,
    ) -> Result<Self> {
        let n = kinship.n_samples();
        if phenotype.len() != n {
            return Err(GwasError::Alignment(format!(
                "phenotype has {} values but the kinship matrix has {} samples",
                phenotype.len(),
                n
            )));
        }
        let (_, var) = mean_variance(&phenotype);
        if !(var > 0.0) {
            return Err(GwasError::DegenerateInput(
                "phenotype has zero variance across retained samples".into(),
            ));
        }

        let (y_rot, x_rot) = rotate_null(&kinship, &phenotype);
        let rotated = RotatedNull {
            eigenvalues: kinship.values(),
            y: &y_rot,
            x: &x_rot,
        };
        let variance_components = estimate_variance_components(&rotated, reml)?;

        Ok(Self::assemble(
            kinship,
            phenotype,
            y_rot,
            x_rot,
            variance_components,
            config,
        ))
    }

    /// Rebuild from a saved null model without re-estimating anything.
    pub fn from_null_model(model: &NullModel, config: AssocConfig) -> Result<Self> {
        model.validate()?;
        let n = model.sample_ids.len();
        let vectors = DenseMatrix::from_col_major(n, n, model.eigenvectors.clone());
        let kinship = SpectralDecomposition::from_parts(
            model.sample_ids.clone(),
            model.eigenvalues.clone(),
            vectors,
        )?
        .repair(&SpectralConfig {
            zero_tolerance: model.zero_tolerance,
        });
        let (y_rot, x_rot) = rotate_null(&kinship, &model.phenotype);
        Ok(Self::assemble(
            kinship,
            model.phenotype.clone(),
            y_rot,
            x_rot,
            model.variance_components,
            config,
        ))
    }

    fn assemble(
        kinship: RepairedKinship,
        phenotype: Vec<f64>,
        y_rot: Vec<f64>,
        x_rot: Vec<f64>,
        variance_components: VarianceComponents,
        config: AssocConfig,
    ) -> Self {
        let delta = variance_components.delta;
        let weights = kinship.values().iter().map(|l| 1.0 / (l + delta)).collect();
        Self {
            kinship,
            phenotype,
            y_rot,
            x_rot,
            weights,
            variance_components,
            config,
        }
    }

    /// Snapshot for persistence.
    pub fn null_model(&self, zero_tolerance: f64) -> NullModel {
        NullModel::new(
            self.kinship.sample_ids().to_vec(),
            self.phenotype.clone(),
            self.variance_components,
            self.kinship.values().to_vec(),
            self.kinship.vectors().to_col_major(),
            zero_tolerance,
        )
    }

    pub fn variance_components(&self) -> &VarianceComponents {
        &self.variance_components
    }

    pub fn sample_ids(&self) -> &[String] {
        self.kinship.sample_ids()
    }

    pub fn kinship(&self) -> &RepairedKinship {
        &self.kinship
    }

    /// Test one marker (codes row-aligned with the model samples). Returns
    /// the samples used, their allele frequency and the outcome.
    pub fn test_marker(&self, codes: &[u8]) -> Result<(usize, Option<f64>, MarkerOutcome)> {
        let path = if codes.iter().any(|&c| c == gwas_geno::MISSING) {
            TestPath::Whitened
        } else {
            TestPath::Rotated
        };
        self.test_marker_via(codes, path)
    }

    /// Test one marker through an explicit path. `Rotated` falls back to
    /// `Whitened` when the marker has missing calls.
    pub fn test_marker_via(
        &self,
        codes: &[u8],
        path: TestPath,
    ) -> Result<(usize, Option<f64>, MarkerOutcome)> {
        let n = self.kinship.n_samples();
        check_marker_codes(codes, n)?;
        let (screened, reason) = screen_marker(codes, &self.config);
        let (n_obs, af) = (screened.n_obs(), screened.af);
        if let Some(reason) = reason {
            return Ok((n_obs, af, MarkerOutcome::Untestable(reason)));
        }

        let outcome = if path == TestPath::Rotated && screened.is_complete(n) {
            let g_rot = self.kinship.vectors().t_mat_vec(&screened.dosages);
            fit_two_column(&self.x_rot, &g_rot, &self.y_rot, Some(&self.weights))
        } else {
            self.whitened_fit(&screened.observed, &screened.dosages)
        };
        Ok((n_obs, af, outcome))
    }

    fn whitened_fit(&self, observed: &[usize], dosages: &[f64]) -> MarkerOutcome {
        let mut h = self.kinship.matrix().principal_submatrix(observed);
        for i in 0..observed.len() {
            h.set(i, i, h.get(i, i) + self.variance_components.delta);
        }
        let chol = match CholeskyDecomp::new(&h) {
            Ok(c) => c,
            Err(e) => {
                debug!("Cholesky of K[S,S] + delta I failed: {}", e);
                return MarkerOutcome::Untestable(UntestableReason::SingularDesign);
            }
        };
        let y: Vec<f64> = observed.iter().map(|&i| self.phenotype[i]).collect();
        let x = chol.whiten(&vec![1.0; observed.len()]);
        let g = chol.whiten(dosages);
        let y = chol.whiten(&y);
        fit_two_column(&x, &g, &y, None)
    }

    /// Test every marker in parallel. The genotype samples must be exactly
    /// the model samples, in the same order.
    pub fn run(&self, genotypes: &GenotypeMatrix) -> Result<GwasReport> {
        if genotypes.sample_ids() != self.sample_ids() {
            return Err(GwasError::Alignment(format!(
                "genotype samples ({}) do not match the null model samples ({})",
                genotypes.n_samples(),
                self.sample_ids().len()
            )));
        }
        info!(
            "Mixed-model scan: {} markers x {} samples (delta = {:.4e})",
            genotypes.n_markers(),
            genotypes.n_samples(),
            self.variance_components.delta
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

        let report = GwasReport::new(
            GwasMethod::MixedModel,
            results,
            Some(self.variance_components),
        );
        info!(
            "Mixed-model scan done: {} tested, {} untestable",
            report.n_tested(),
            report.n_untestable()
        );
        Ok(report)
    }
}

/// U'y and U'1.
fn rotate_null(kinship: &RepairedKinship, phenotype: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let u = kinship.vectors();
    let y_rot = u.t_mat_vec(phenotype);
    let x_rot = u.t_mat_vec(&vec![1.0; phenotype.len()]);
    (y_rot, x_rot)
}
