//! Per-marker association testing.
//!
//! Both methods share the same per-marker policy: samples with a missing
//! call are dropped for that marker only, and a marker that cannot support
//! the y ~ 1 + g fit is reported as untestable rather than given a p-value.
//!
//! - `naive`: ordinary least squares, ignoring kinship
//! - `report`: result collection, Bonferroni threshold, writers
//!
//! The mixed-model test lives in [`crate::lmm::mixed`].

pub mod naive;
pub mod report;

use std::fmt;

use gwas_geno::genotype::is_valid_code;
use gwas_geno::{MarkerInfo, MISSING};

use crate::error::{GwasError, Result};
use crate::util::math::t_test_p_value;

/// Per-marker testability rules.
#[derive(Debug, Clone)]
pub struct AssocConfig {
    /// Minimum non-missing samples for a marker to be tested (at least 3).
    pub min_observations: usize,
    /// Minimum count of the least common observed dosage value.
    pub min_minor_genotype_count: usize,
}

impl Default for AssocConfig {
    fn default() -> Self {
        Self {
            min_observations: 3,
            min_minor_genotype_count: 1,
        }
    }
}

impl AssocConfig {
    /// The design has rank 2, so residual df needs n >= 3.
    fn required_observations(&self) -> usize {
        self.min_observations.max(3)
    }
}

/// Why a marker produced no test statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntestableReason {
    /// All observed samples share one dosage.
    Monomorphic,
    /// Too few non-missing samples.
    TooFewObservations { observed: usize, required: usize },
    /// The least common dosage value is too rare.
    RareGenotype { count: usize, required: usize },
    /// The weighted design matrix is numerically singular.
    SingularDesign,
}

impl fmt::Display for UntestableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UntestableReason::Monomorphic => write!(f, "untestable:monomorphic"),
            UntestableReason::TooFewObservations { observed, required } => {
                write!(f, "untestable:too_few_observations({}<{})", observed, required)
            }
            UntestableReason::RareGenotype { count, required } => {
                write!(f, "untestable:rare_genotype({}<{})", count, required)
            }
            UntestableReason::SingularDesign => write!(f, "untestable:singular_design"),
        }
    }
}

/// Fitted marker effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerTest {
    pub beta: f64,
    pub se: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

/// Either a test result or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerOutcome {
    Tested(MarkerTest),
    Untestable(UntestableReason),
}

/// One output row; every input marker gets exactly one.
#[derive(Debug, Clone)]
pub struct AssociationResult {
    pub marker: MarkerInfo,
    /// Samples used for this marker.
    pub n_obs: usize,
    /// Alt-allele frequency among those samples.
    pub af: Option<f64>,
    pub outcome: MarkerOutcome,
}

impl AssociationResult {
    pub fn p_value(&self) -> Option<f64> {
        match self.outcome {
            MarkerOutcome::Tested(t) => Some(t.p_value),
            MarkerOutcome::Untestable(_) => None,
        }
    }

    pub fn is_tested(&self) -> bool {
        matches!(self.outcome, MarkerOutcome::Tested(_))
    }

    pub fn untestable_reason(&self) -> Option<UntestableReason> {
        match self.outcome {
            MarkerOutcome::Untestable(r) => Some(r),
            MarkerOutcome::Tested(_) => None,
        }
    }
}

/// Samples observed at one marker and their dosages.
#[derive(Debug, Clone)]
pub(crate) struct ScreenedMarker {
    /// Row indices with a call.
    pub observed: Vec<usize>,
    /// Dosage for each observed row.
    pub dosages: Vec<f64>,
    pub af: Option<f64>,
}

impl ScreenedMarker {
    pub fn n_obs(&self) -> usize {
        self.observed.len()
    }

    pub fn is_complete(&self, n: usize) -> bool {
        self.observed.len() == n
    }
}

/// Reject a marker slice that is not one code per sample or holds a code
/// outside 0, 1, 2 and [`MISSING`].
pub(crate) fn check_marker_codes(codes: &[u8], n_samples: usize) -> Result<()> {
    if codes.len() != n_samples {
        return Err(GwasError::Alignment(format!(
            "marker has {} calls but the model has {} samples",
            codes.len(),
            n_samples
        )));
    }
    if let Some((i, &c)) = codes.iter().enumerate().find(|(_, &c)| !is_valid_code(c)) {
        return Err(GwasError::DegenerateInput(format!(
            "invalid dosage code {} for sample {} (expected 0, 1, 2 or missing)",
            c, i
        )));
    }
    Ok(())
}

/// Apply the missing-call and testability rules to one marker. Codes must
/// already have passed [`check_marker_codes`].
pub(crate) fn screen_marker(
    codes: &[u8],
    config: &AssocConfig,
) -> (ScreenedMarker, Option<UntestableReason>) {
    let mut observed = Vec::with_capacity(codes.len());
    let mut dosages = Vec::with_capacity(codes.len());
    let mut counts = [0usize; 3];
    for (i, &c) in codes.iter().enumerate() {
        if c == MISSING {
            continue;
        }
        observed.push(i);
        dosages.push(c as f64);
        counts[c as usize] += 1;
    }
    let n_obs = observed.len();
    let af = (n_obs > 0).then(|| dosages.iter().sum::<f64>() / (2.0 * n_obs as f64));
    let screened = ScreenedMarker {
        observed,
        dosages,
        af,
    };

    let required = config.required_observations();
    if n_obs < required {
        let reason = UntestableReason::TooFewObservations {
            observed: n_obs,
            required,
        };
        return (screened, Some(reason));
    }

    let present: Vec<usize> = counts.iter().copied().filter(|&c| c > 0).collect();
    if present.len() < 2 {
        return (screened, Some(UntestableReason::Monomorphic));
    }
    let rarest = present.iter().copied().min().unwrap_or(0);
    if rarest < config.min_minor_genotype_count {
        let reason = UntestableReason::RareGenotype {
            count: rarest,
            required: config.min_minor_genotype_count,
        };
        return (screened, Some(reason));
    }

    (screened, None)
}

/// Generalised least squares for y ~ b0 * x + b1 * g with diagonal weights.
///
/// `weights = None` means ordinary least squares. The residual variance is
/// estimated from the weighted residuals with n - 2 degrees of freedom and
/// the marker effect is tested with a t distribution on the same df.
pub(crate) fn fit_two_column(
    x: &[f64],
    g: &[f64],
    y: &[f64],
    weights: Option<&[f64]>,
) -> MarkerOutcome {
    let n = y.len();
    let w = |i: usize| weights.map_or(1.0, |w| w[i]);

    let (mut a11, mut a12, mut a22, mut b1, mut b2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for i in 0..n {
        let wi = w(i);
        a11 += wi * x[i] * x[i];
        a12 += wi * x[i] * g[i];
        a22 += wi * g[i] * g[i];
        b1 += wi * x[i] * y[i];
        b2 += wi * g[i] * y[i];
    }

    // Relative determinant guards against a marker collinear with the
    // intercept after weighting.
    let det = a11 * a22 - a12 * a12;
    if !(det > 1e-10 * a11 * a22) || n < 3 {
        return MarkerOutcome::Untestable(UntestableReason::SingularDesign);
    }

    let b0 = (a22 * b1 - a12 * b2) / det;
    let beta = (a11 * b2 - a12 * b1) / det;

    let rss: f64 = (0..n)
        .map(|i| {
            let r = y[i] - b0 * x[i] - beta * g[i];
            w(i) * r * r
        })
        .sum();
    let df = (n - 2) as f64;
    let sigma2 = rss / df;
    let se = (sigma2 * a11 / det).sqrt();
    let t_stat = beta / se;

    match t_test_p_value(t_stat, df) {
        Some(p_value) if se > 0.0 => MarkerOutcome::Tested(MarkerTest {
            beta,
            se,
            t_stat,
            p_value,
        }),
        _ => MarkerOutcome::Untestable(UntestableReason::SingularDesign),
    }
}
