//! Small statistical helpers shared by the association tests.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
///
/// `None` if `t` is not finite or `df` is not positive.
pub fn t_test_p_value(t: f64, df: f64) -> Option<f64> {
    if !t.is_finite() {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

/// 1-df chi-square statistic matching a two-sided p-value.
pub fn chi2_1df_from_p(p: f64) -> f64 {
    let p = p.clamp(f64::MIN_POSITIVE, 1.0);
    let z = Normal::standard().inverse_cdf(p / 2.0);
    z * z
}

/// Median of a non-empty slice; `None` if empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 {
        0.5 * (v[mid - 1] + v[mid])
    } else {
        v[mid]
    })
}

/// Sample mean and (n - 1) variance.
pub fn mean_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, ss / (n - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_test_p_value() {
        assert_eq!(t_test_p_value(0.0, 10.0), Some(1.0));
        // t = 2.228 is the 97.5% quantile at 10 df
        let p = t_test_p_value(2.228_138_85, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-6, "p = {}", p);
        assert_eq!(t_test_p_value(-2.228_138_85, 10.0), Some(p));
        assert_eq!(t_test_p_value(f64::NAN, 10.0), None);
        assert_eq!(t_test_p_value(1.0, 0.0), None);
    }

    #[test]
    fn test_chi2_from_p() {
        // p = 0.05 -> z = 1.959964
        assert!((chi2_1df_from_p(0.05) - 1.959_964f64.powi(2)).abs() < 1e-4);
        assert!((chi2_1df_from_p(0.5) - 0.454_936).abs() < 1e-5);
        assert!(chi2_1df_from_p(0.0).is_finite());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_mean_variance() {
        let (m, v) = mean_variance(&[1.0, 2.0, 3.0, 4.0]);
        assert!((m - 2.5).abs() < 1e-12);
        assert!((v - 5.0 / 3.0).abs() < 1e-12);
    }
}
