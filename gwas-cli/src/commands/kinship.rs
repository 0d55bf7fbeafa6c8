//! Estimate the kinship matrix.
//!
//! gwas kinship --plink-file ... [--pheno-file ... --pheno-col ...] --output-prefix ...

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tracing::info;

use gwas_core::kinship::estimate_kinship;
use gwas_core::spectral::{SpectralConfig, SpectralDecomposition};

use super::{create_output, prepare_genotypes, GenotypeInput, PhenotypeInput};

#[derive(Args)]
pub struct KinshipArgs {
    #[command(flatten)]
    genotypes: GenotypeInput,

    #[command(flatten)]
    phenotype: PhenotypeInput,

    /// Minimum MAF for kinship markers
    #[arg(long, default_value = "0.05")]
    min_maf: f64,

    /// Eigenvalues below this are clamped to zero in the repaired matrix
    #[arg(long, default_value = "1e-8")]
    zero_tolerance: f64,

    /// Output file prefix
    #[arg(long)]
    output_prefix: String,
}

pub fn run(args: KinshipArgs) -> Result<()> {
    info!("=== GWAS-RS: Kinship ===");
    let raw = args.genotypes.load()?;
    let pheno = args.phenotype.load()?;
    let g = prepare_genotypes(&raw, pheno.as_ref(), args.min_maf)?;

    let kinship = estimate_kinship(&g)?;
    let repaired = SpectralDecomposition::decompose(&kinship)?.repair(&SpectralConfig {
        zero_tolerance: args.zero_tolerance,
    });

    let raw_path = format!("{}.kinship.tsv", args.output_prefix);
    let mut out = create_output(&raw_path)?;
    kinship.write_tsv(&mut out)?;
    out.flush()?;

    let repaired_path = format!("{}.kinship.repaired.tsv", args.output_prefix);
    let mut out = create_output(&repaired_path)?;
    repaired.to_kinship()?.write_tsv(&mut out)?;
    out.flush()?;

    info!(
        "Wrote {} and {} ({} eigenvalue(s) clamped)",
        raw_path,
        repaired_path,
        repaired.n_clamped()
    );
    Ok(())
}
