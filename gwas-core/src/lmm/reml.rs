//! Restricted maximum likelihood for y = mu + g + e in the kinship eigenbasis.
//!
//! With K = U diag(lambda) U', rotating by U' makes the covariance diagonal:
//! Var(U'y) = sigma_g^2 diag(lambda_i + delta), delta = sigma_e^2 / sigma_g^2.
//! Profiling out mu and sigma_g^2 leaves a function of delta alone:
//!
//!   l_R(delta) = c - 1/2 [ (n-1) ln R + sum ln H_i + ln A ]
//!
//! with H_i = lambda_i + delta, A = sum x_i^2 / H_i, R = sum r_i^2 / H_i
//! (r the GLS residual) and c = (n-1)/2 (ln(n-1) - 1 - ln 2 pi).
//! It is maximised over log10(delta) by a grid followed by Brent refinement.

use gwas_linalg::optimize::{grid_brent_maximize, GridBrentConfig, OptimizeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GwasError, Result};

/// Configuration for the one-dimensional REML search.
#[derive(Debug, Clone)]
pub struct RemlConfig {
    /// Lower end of the log10(delta) search interval.
    pub log10_delta_min: f64,
    /// Upper end of the log10(delta) search interval.
    pub log10_delta_max: f64,
    /// Number of grid intervals before refinement.
    pub grid_points: usize,
    /// Convergence tolerance on log10(delta).
    pub tol: f64,
    /// Maximum Brent iterations.
    pub max_iter: usize,
}

impl Default for RemlConfig {
    fn default() -> Self {
        Self {
            log10_delta_min: -5.0,
            log10_delta_max: 5.0,
            grid_points: 100,
            tol: 1e-6,
            max_iter: 100,
        }
    }
}

/// Null-model variance components, fixed for every marker test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceComponents {
    /// Genetic variance sigma_g^2.
    pub sigma_g2: f64,
    /// Residual variance sigma_e^2.
    pub sigma_e2: f64,
    /// delta = sigma_e^2 / sigma_g^2.
    pub delta: f64,
    /// h^2 = sigma_g^2 / (sigma_g^2 + sigma_e^2).
    pub h2: f64,
    /// Restricted log-likelihood at the optimum.
    pub reml_log_likelihood: f64,
}

/// Rotated null-model data: eigenvalues, U'y and U'1.
pub struct RotatedNull<'a> {
    pub eigenvalues: &'a [f64],
    pub y: &'a [f64],
    pub x: &'a [f64],
}

impl RotatedNull<'_> {
    fn n(&self) -> usize {
        self.eigenvalues.len()
    }

    /// GLS intercept and weighted residual sum of squares at `delta`.
    ///
    /// Returns (mu, R, A, sum ln H).
    fn profile(&self, delta: f64) -> (f64, f64, f64, f64) {
        let mut a = 0.0;
        let mut b = 0.0;
        let mut log_h = 0.0;
        for i in 0..self.n() {
            let h = self.eigenvalues[i] + delta;
            a += self.x[i] * self.x[i] / h;
            b += self.x[i] * self.y[i] / h;
            log_h += h.ln();
        }
        let mu = b / a;
        let r: f64 = (0..self.n())
            .map(|i| {
                let e = self.y[i] - mu * self.x[i];
                e * e / (self.eigenvalues[i] + delta)
            })
            .sum();
        (mu, r, a, log_h)
    }

    /// Restricted log-likelihood at `delta` (sigma_g^2 profiled out).
    pub fn log_likelihood(&self, delta: f64) -> f64 {
        let df = (self.n() - 1) as f64;
        let (_, r, a, log_h) = self.profile(delta);
        let c = 0.5 * df * (df.ln() - 1.0 - (2.0 * std::f64::consts::PI).ln());
        c - 0.5 * (df * r.ln() + log_h + a.ln())
    }
}

/// Estimate variance components by maximising the restricted likelihood.
pub fn estimate_variance_components(
    rotated: &RotatedNull<'_>,
    config: &RemlConfig,
) -> Result<VarianceComponents> {
    let n = rotated.n();
    if n < 3 || rotated.y.len() != n || rotated.x.len() != n {
        return Err(GwasError::DegenerateInput(format!(
            "variance-component estimation needs at least 3 aligned samples, got {}",
            n
        )));
    }

    let search = GridBrentConfig {
        lo: config.log10_delta_min,
        hi: config.log10_delta_max,
        grid_points: config.grid_points,
        tol: config.tol,
        max_iter: config.max_iter,
    };
    let objective = |log10_delta: f64| rotated.log_likelihood(10f64.powf(log10_delta));

    let best = grid_brent_maximize(objective, &search).map_err(|e| match e {
        OptimizeError::NoFiniteValue { .. } => GwasError::NumericalInstability(
            "restricted likelihood is not finite anywhere in the delta search interval".into(),
        ),
        other => GwasError::NumericalInstability(other.to_string()),
    })?;

    let scale = best.value.abs().max(1.0);
    if best.grid_range <= 1e-10 * scale {
        return Err(GwasError::NumericalInstability(format!(
            "restricted likelihood is flat over log10(delta) in [{}, {}]",
            config.log10_delta_min, config.log10_delta_max
        )));
    }
    if best.at_boundary {
        warn!(
            "REML optimum at the edge of the search interval (log10 delta = {:.3}); \
             heritability is at its bound",
            best.x
        );
    }

    let delta = 10f64.powf(best.x);
    let (_, r, _, _) = rotated.profile(delta);
    let sigma_g2 = r / (n - 1) as f64;
    let sigma_e2 = delta * sigma_g2;
    let vc = VarianceComponents {
        sigma_g2,
        sigma_e2,
        delta,
        h2: 1.0 / (1.0 + delta),
        reml_log_likelihood: best.value,
    };
    if !(vc.sigma_g2.is_finite() && vc.sigma_g2 > 0.0 && vc.reml_log_likelihood.is_finite()) {
        return Err(GwasError::NumericalInstability(format!(
            "non-finite variance components at delta = {:.4e}",
            delta
        )));
    }

    debug!("REML refinement used {} Brent iterations", best.iterations);
    info!(
        "REML: sigma_g2 = {:.4e}, sigma_e2 = {:.4e}, delta = {:.4e}, h2 = {:.4}, logL = {:.4}",
        vc.sigma_g2, vc.sigma_e2, vc.delta, vc.h2, vc.reml_log_likelihood
    );
    Ok(vc)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct REML for V = K + delta I, computed without the eigenbasis
    /// (diagonal K so the determinant and inverse are explicit).
    fn direct_reml(lambda: &[f64], y: &[f64], delta: f64) -> f64 {
        let n = lambda.len() as f64;
        let h: Vec<f64> = lambda.iter().map(|l| l + delta).collect();
        let a: f64 = h.iter().map(|h| 1.0 / h).sum();
        let b: f64 = h.iter().zip(y).map(|(h, y)| y / h).sum();
        let mu = b / a;
        let r: f64 = h.iter().zip(y).map(|(h, y)| (y - mu).powi(2) / h).sum();
        let sigma2 = r / (n - 1.0);
        // -1/2 [ (n-1) ln(2 pi sigma2) + sum ln H + ln A + R / sigma2 ]
        -0.5 * ((n - 1.0) * (2.0 * std::f64::consts::PI * sigma2).ln()
            + h.iter().map(|h| h.ln()).sum::<f64>()
            + a.ln()
            + r / sigma2)
    }

    #[test]
    fn test_profiled_likelihood_matches_direct_form() {
        let lambda = [3.0, 1.5, 0.7, 0.2, 0.0];
        let y = [1.2, -0.4, 0.9, 0.1, -1.1];
        let x = [1.0; 5];
        let rot = RotatedNull {
            eigenvalues: &lambda,
            y: &y,
            x: &x,
        };
        for &delta in &[0.01, 0.5, 2.0, 30.0] {
            let a = rot.log_likelihood(delta);
            let b = direct_reml(&lambda, &y, delta);
            assert!((a - b).abs() < 1e-10, "delta={} {} vs {}", delta, a, b);
        }
    }

    #[test]
    fn test_optimum_beats_grid_neighbours() {
        let lambda: Vec<f64> = (0..40).map(|i| 4.0 / (1.0 + i as f64)).collect();
        // y with more spread on the large-eigenvalue directions
        let y: Vec<f64> = lambda
            .iter()
            .enumerate()
            .map(|(i, l)| (if i % 2 == 0 { 1.0 } else { -1.0 }) * (l + 0.5).sqrt())
            .collect();
        let mut x = vec![0.0; 40];
        x[0] = 40f64.sqrt();
        let rot = RotatedNull {
            eigenvalues: &lambda,
            y: &y,
            x: &x,
        };
        let vc = estimate_variance_components(&rot, &RemlConfig::default()).unwrap();
        assert!(vc.delta > 0.0);
        assert!((vc.h2 - 1.0 / (1.0 + vc.delta)).abs() < 1e-12);
        assert!((vc.sigma_e2 - vc.delta * vc.sigma_g2).abs() < 1e-12);
        for f in [0.9, 1.1] {
            assert!(rot.log_likelihood(vc.delta * f) <= vc.reml_log_likelihood + 1e-9);
        }
    }

    #[test]
    fn test_flat_likelihood_is_instability() {
        // all-zero kinship: l_R does not depend on delta
        let lambda = [0.0; 6];
        let y = [0.3, -1.0, 0.8, 0.1, -0.2, 0.5];
        let x = [1.0; 6];
        let rot = RotatedNull {
            eigenvalues: &lambda,
            y: &y,
            x: &x,
        };
        assert!(matches!(
            estimate_variance_components(&rot, &RemlConfig::default()),
            Err(GwasError::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_constant_phenotype_is_instability() {
        let lambda = [2.0, 1.0, 0.5, 0.1];
        let y = [0.0; 4];
        let x = [2.0, 0.0, 0.0, 0.0];
        let rot = RotatedNull {
            eigenvalues: &lambda,
            y: &y,
            x: &x,
        };
        assert!(matches!(
            estimate_variance_components(&rot, &RemlConfig::default()),
            Err(GwasError::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_too_few_samples() {
        let rot = RotatedNull {
            eigenvalues: &[1.0, 0.5],
            y: &[1.0, 2.0],
            x: &[1.0, 1.0],
        };
        assert!(matches!(
            estimate_variance_components(&rot, &RemlConfig::default()),
            Err(GwasError::DegenerateInput(_))
        ));
    }
}
