//! Association results for one method, with the genome-wide threshold and
//! tab-separated output.

use std::fmt;
use std::io::Write;

use crate::assoc::{AssociationResult, MarkerOutcome};
use crate::lmm::VarianceComponents;
use crate::util::math::{chi2_1df_from_p, median};

/// Median of the 1-df chi-square distribution.
const CHI2_1DF_MEDIAN: f64 = 0.454_936_423_119_572_7;

/// Which test produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GwasMethod {
    MixedModel,
    Naive,
}

impl fmt::Display for GwasMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GwasMethod::MixedModel => write!(f, "lmm"),
            GwasMethod::Naive => write!(f, "linear"),
        }
    }
}

/// Results of one GWAS method, one row per input marker in input order.
#[derive(Debug, Clone)]
pub struct GwasReport {
    method: GwasMethod,
    results: Vec<AssociationResult>,
    variance_components: Option<VarianceComponents>,
}

impl GwasReport {
    pub fn new(
        method: GwasMethod,
        results: Vec<AssociationResult>,
        variance_components: Option<VarianceComponents>,
    ) -> Self {
        Self {
            method,
            results,
            variance_components,
        }
    }

    pub fn method(&self) -> GwasMethod {
        self.method
    }

    pub fn results(&self) -> &[AssociationResult] {
        &self.results
    }

    /// The null-model components (mixed model only).
    pub fn variance_components(&self) -> Option<&VarianceComponents> {
        self.variance_components.as_ref()
    }

    /// Markers with a p-value. This is the Bonferroni denominator.
    pub fn n_tested(&self) -> usize {
        self.results.iter().filter(|r| r.is_tested()).count()
    }

    pub fn n_untestable(&self) -> usize {
        self.results.len() - self.n_tested()
    }

    /// p-values of tested markers, in marker order.
    pub fn p_values(&self) -> Vec<f64> {
        self.results.iter().filter_map(|r| r.p_value()).collect()
    }

    /// alpha / n_tested; `None` when nothing was tested.
    pub fn bonferroni_threshold(&self, alpha: f64) -> Option<f64> {
        match self.n_tested() {
            0 => None,
            n => Some(alpha / n as f64),
        }
    }

    /// Tested markers whose p-value is below the Bonferroni threshold.
    pub fn significant(&self, alpha: f64) -> Vec<&AssociationResult> {
        let Some(threshold) = self.bonferroni_threshold(alpha) else {
            return Vec::new();
        };
        self.results
            .iter()
            .filter(|r| r.p_value().is_some_and(|p| p < threshold))
            .collect()
    }

    /// Genomic inflation factor: median chi-square over its null median.
    pub fn genomic_inflation(&self) -> Option<f64> {
        let chi2: Vec<f64> = self.p_values().into_iter().map(chi2_1df_from_p).collect();
        median(&chi2).map(|m| m / CHI2_1DF_MEDIAN)
    }

    /// Write all rows as TSV.
    pub fn write_tsv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write_results_header(out)?;
        for r in &self.results {
            write_result_line(out, r)?;
        }
        Ok(())
    }
}

/// Column header for association output.
pub fn write_results_header<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "marker\tchrom\tpos\tn_obs\taf\tbeta\tse\tt_stat\tp_value\tstatus")
}

/// One association row; missing fields are written as NA.
pub fn write_result_line<W: Write>(out: &mut W, r: &AssociationResult) -> std::io::Result<()> {
    let af = r.af.map_or_else(|| "NA".to_string(), |v| format!("{:.6}", v));
    match r.outcome {
        MarkerOutcome::Tested(t) => writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{:.6e}\t{:.6e}\t{:.6}\t{:.6e}\tok",
            r.marker.id, r.marker.chrom, r.marker.pos, r.n_obs, af, t.beta, t.se, t.t_stat, t.p_value
        ),
        MarkerOutcome::Untestable(reason) => writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\tNA\tNA\tNA\tNA\t{}",
            r.marker.id, r.marker.chrom, r.marker.pos, r.n_obs, af, reason
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assoc::{MarkerTest, UntestableReason};
    use gwas_geno::MarkerInfo;

    fn row(id: &str, p: Option<f64>) -> AssociationResult {
        AssociationResult {
            marker: MarkerInfo::new(id, "1", 100),
            n_obs: 10,
            af: Some(0.25),
            outcome: match p {
                Some(p_value) => MarkerOutcome::Tested(MarkerTest {
                    beta: 0.5,
                    se: 0.1,
                    t_stat: 5.0,
                    p_value,
                }),
                None => MarkerOutcome::Untestable(UntestableReason::Monomorphic),
            },
        }
    }

    #[test]
    fn test_bonferroni_counts_only_tested() {
        let report = GwasReport::new(
            GwasMethod::Naive,
            vec![
                row("a", Some(0.001)),
                row("b", None),
                row("c", Some(0.5)),
                row("d", Some(0.02)),
            ],
            None,
        );
        assert_eq!(report.n_tested(), 3);
        assert_eq!(report.n_untestable(), 1);
        let thr = report.bonferroni_threshold(0.05).unwrap();
        assert!((thr - 0.05 / 3.0).abs() < 1e-15);
        let sig: Vec<&str> = report
            .significant(0.05)
            .iter()
            .map(|r| r.marker.id.as_str())
            .collect();
        assert_eq!(sig, vec!["a"]);
    }

    #[test]
    fn test_no_tested_markers() {
        let report = GwasReport::new(GwasMethod::MixedModel, vec![row("a", None)], None);
        assert_eq!(report.bonferroni_threshold(0.05), None);
        assert!(report.significant(0.05).is_empty());
        assert_eq!(report.genomic_inflation(), None);
    }

    #[test]
    fn test_genomic_inflation_at_null_median() {
        let report = GwasReport::new(GwasMethod::Naive, vec![row("a", Some(0.5))], None);
        assert!((report.genomic_inflation().unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_write_tsv() {
        let report = GwasReport::new(GwasMethod::Naive, vec![row("a", Some(0.01)), row("b", None)], None);
        let mut buf = Vec::new();
        report.write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("marker\tchrom\tpos"));
        assert!(lines[1].ends_with("\tok"));
        assert_eq!(
            lines[2],
            "b\t1\t100\t10\t0.250000\tNA\tNA\tNA\tNA\tuntestable:monomorphic"
        );
    }
}
