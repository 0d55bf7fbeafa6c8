//! Sample alignment and MAF-based marker filtering.
//!
//! Produces the immutable, index-aligned genotype/phenotype pair every
//! downstream stage consumes. Nothing here mutates caller-owned data.

use std::collections::HashMap;

use gwas_geno::{GenotypeMatrix, PhenotypeVector, MISSING};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{GwasError, Result};

/// Configuration for QC filtering.
#[derive(Debug, Clone)]
pub struct QcConfig {
    /// Markers with minor allele frequency strictly below this are dropped.
    pub min_maf: f64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self { min_maf: 0.05 }
    }
}

/// Aligned, filtered inputs.
#[derive(Debug, Clone)]
pub struct QcOutput {
    /// Retained samples (genotype order) x retained markers.
    pub genotypes: GenotypeMatrix,
    /// Trait values, row-aligned with `genotypes`.
    pub phenotype: Vec<f64>,
    /// Genotyped samples dropped for lack of a trait value.
    pub samples_dropped: usize,
    /// Markers dropped by the MAF filter.
    pub markers_dropped: usize,
}

/// Alt-allele frequency over non-missing calls; `None` if all are missing.
pub fn allele_frequency(codes: &[u8]) -> Option<f64> {
    let (sum, n) = codes
        .iter()
        .filter(|&&c| c != MISSING)
        .fold((0u64, 0u64), |(s, n), &c| (s + c as u64, n + 1));
    (n > 0).then(|| sum as f64 / (2.0 * n as f64))
}

/// Minor allele frequency; 0 for a marker with no observed calls.
pub fn minor_allele_frequency(codes: &[u8]) -> f64 {
    allele_frequency(codes).map_or(0.0, |p| p.min(1.0 - p))
}

/// Alt-allele frequency for every marker, in parallel.
pub fn allele_frequencies(genotypes: &GenotypeMatrix) -> Vec<Option<f64>> {
    (0..genotypes.n_markers())
        .into_par_iter()
        .map(|j| allele_frequency(genotypes.marker(j)))
        .collect()
}

/// Keep genotyped samples that have a measured trait value.
///
/// Every phenotype ID must name a genotyped sample. Retained samples keep
/// their genotype order.
pub fn align_samples(
    genotypes: &GenotypeMatrix,
    phenotype: &PhenotypeVector,
) -> Result<(GenotypeMatrix, Vec<f64>)> {
    let rows: HashMap<&str, usize> = genotypes
        .sample_ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let unknown: Vec<&str> = phenotype
        .sample_ids()
        .iter()
        .map(String::as_str)
        .filter(|id| !rows.contains_key(id))
        .collect();
    if !unknown.is_empty() {
        let shown: Vec<&str> = unknown.iter().take(5).copied().collect();
        return Err(GwasError::Alignment(format!(
            "{} phenotype sample(s) have no genotype row (e.g. {})",
            unknown.len(),
            shown.join(", ")
        )));
    }

    let mut keep = Vec::new();
    let mut y = Vec::new();
    for (i, id) in genotypes.sample_ids().iter().enumerate() {
        if let Some(Some(v)) = phenotype.get(id) {
            keep.push(i);
            y.push(v);
        }
    }
    Ok((genotypes.select_samples(&keep)?, y))
}

/// Reorder genotype rows to match `sample_ids` exactly.
///
/// Used when scanning against a saved null model; every model sample must
/// be genotyped. Extra genotyped samples are dropped.
pub fn align_to_samples(genotypes: &GenotypeMatrix, sample_ids: &[String]) -> Result<GenotypeMatrix> {
    let rows: HashMap<&str, usize> = genotypes
        .sample_ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut keep = Vec::with_capacity(sample_ids.len());
    for id in sample_ids {
        match rows.get(id.as_str()) {
            Some(&i) => keep.push(i),
            None => {
                return Err(GwasError::Alignment(format!(
                    "sample {} is in the model but has no genotype row",
                    id
                )))
            }
        }
    }
    debug!(
        "Aligned {} genotyped samples to {} model samples",
        genotypes.n_samples(),
        keep.len()
    );
    Ok(genotypes.select_samples(&keep)?)
}

/// Drop markers whose MAF is below `min_maf`, metadata included.
pub fn filter_markers_by_maf(genotypes: &GenotypeMatrix, min_maf: f64) -> Result<GenotypeMatrix> {
    let keep: Vec<usize> = (0..genotypes.n_markers())
        .into_par_iter()
        .filter(|&j| minor_allele_frequency(genotypes.marker(j)) >= min_maf)
        .collect();
    Ok(genotypes.select_markers(&keep)?)
}

/// Full QC: sample alignment, then MAF filtering.
pub fn run_qc(
    genotypes: &GenotypeMatrix,
    phenotype: &PhenotypeVector,
    config: &QcConfig,
) -> Result<QcOutput> {
    let (aligned, y) = align_samples(genotypes, phenotype)?;
    let samples_dropped = genotypes.n_samples() - aligned.n_samples();
    if aligned.n_samples() < 2 {
        return Err(GwasError::DegenerateInput(format!(
            "{} sample(s) with both genotypes and a trait value; need at least 2",
            aligned.n_samples()
        )));
    }

    let filtered = filter_markers_by_maf(&aligned, config.min_maf)?;
    let markers_dropped = aligned.n_markers() - filtered.n_markers();
    if filtered.n_markers() == 0 {
        return Err(GwasError::DegenerateInput(format!(
            "no markers pass MAF >= {} ({} tested)",
            config.min_maf,
            aligned.n_markers()
        )));
    }

    info!(
        "QC: {} samples retained ({} dropped), {} markers retained ({} below MAF {})",
        filtered.n_samples(),
        samples_dropped,
        filtered.n_markers(),
        markers_dropped,
        config.min_maf
    );
    debug!("Phenotype mean {:.4}", y.iter().sum::<f64>() / y.len() as f64);

    Ok(QcOutput {
        genotypes: filtered,
        phenotype: y,
        samples_dropped,
        markers_dropped,
    })
}
