//! Subcommands and the input options they share.

pub mod assoc;
pub mod kinship;
pub mod model_summary;
pub mod pca;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use gwas_core::qc::{filter_markers_by_maf, run_qc, QcConfig};
use gwas_geno::dosage_table::DosageTableReader;
use gwas_geno::phenotype::parse_phenotype_file;
use gwas_geno::plink::PlinkReader;
use gwas_geno::{GenotypeMatrix, GenotypeSource, PhenotypeVector};

/// Where genotypes come from: exactly one of the two.
#[derive(Args)]
pub struct GenotypeInput {
    /// PLINK file prefix (bed/bim/fam)
    #[arg(long, required_unless_present = "dosage_file", conflicts_with = "dosage_file")]
    pub plink_file: Option<String>,

    /// Tab-separated dosage table (marker chrom pos S1 S2 ...)
    #[arg(long)]
    pub dosage_file: Option<String>,
}

impl GenotypeInput {
    pub fn load(&self) -> Result<GenotypeMatrix> {
        let g = match (&self.plink_file, &self.dosage_file) {
            (Some(prefix), _) => PlinkReader::new(prefix)?.load_matrix()?,
            (None, Some(path)) => DosageTableReader::new(path)?.load_matrix()?,
            (None, None) => anyhow::bail!("one of --plink-file or --dosage-file is required"),
        };
        info!(
            "Loaded {} markers x {} samples",
            g.n_markers(),
            g.n_samples()
        );
        Ok(g)
    }
}

/// Trait values keyed by sample ID.
#[derive(Args)]
pub struct PhenotypeInput {
    /// Phenotype file path
    #[arg(long)]
    pub pheno_file: Option<String>,

    /// Phenotype column name
    #[arg(long, default_value = "y")]
    pub pheno_col: String,

    /// Sample ID column name
    #[arg(long, default_value = "IID")]
    pub sample_id_col: String,
}

impl PhenotypeInput {
    pub fn load(&self) -> Result<Option<PhenotypeVector>> {
        let Some(path) = &self.pheno_file else {
            return Ok(None);
        };
        let pheno = parse_phenotype_file(Path::new(path), &self.pheno_col, &self.sample_id_col)?;
        info!(
            "Loaded phenotype '{}' for {} samples ({} observed)",
            self.pheno_col,
            pheno.len(),
            pheno.n_observed()
        );
        Ok(Some(pheno))
    }
}

/// QC'd genotypes; sample alignment only when a phenotype is given.
pub fn prepare_genotypes(
    genotypes: &GenotypeMatrix,
    phenotype: Option<&PhenotypeVector>,
    min_maf: f64,
) -> Result<GenotypeMatrix> {
    let config = QcConfig { min_maf };
    Ok(match phenotype {
        Some(pheno) => run_qc(genotypes, pheno, &config)?.genotypes,
        None => filter_markers_by_maf(genotypes, config.min_maf)?,
    })
}

pub fn create_output(path: &str) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    Ok(BufWriter::new(file))
}
