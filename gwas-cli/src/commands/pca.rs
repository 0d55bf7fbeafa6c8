//! Principal components of the kinship matrix.
//!
//! gwas pca --plink-file ... --n-pcs 10 --output-prefix ...

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tracing::info;

use gwas_core::kinship::estimate_kinship;
use gwas_core::pca::PrincipalComponents;
use gwas_core::spectral::SpectralDecomposition;

use super::{create_output, prepare_genotypes, GenotypeInput, PhenotypeInput};

#[derive(Args)]
pub struct PcaArgs {
    #[command(flatten)]
    genotypes: GenotypeInput,

    #[command(flatten)]
    phenotype: PhenotypeInput,

    /// Minimum MAF for kinship markers
    #[arg(long, default_value = "0.05")]
    min_maf: f64,

    /// Number of principal components to report
    #[arg(long, default_value = "10")]
    n_pcs: usize,

    /// Output file prefix
    #[arg(long)]
    output_prefix: String,
}

pub fn run(args: PcaArgs) -> Result<()> {
    info!("=== GWAS-RS: PCA ===");
    let raw = args.genotypes.load()?;
    let pheno = args.phenotype.load()?;
    let g = prepare_genotypes(&raw, pheno.as_ref(), args.min_maf)?;

    let sd = SpectralDecomposition::decompose(&estimate_kinship(&g)?)?;
    let pcs = PrincipalComponents::from_decomposition(&sd, args.n_pcs);

    let scores_path = format!("{}.pcs.tsv", args.output_prefix);
    let mut out = create_output(&scores_path)?;
    pcs.write_scores(&mut out)?;
    out.flush()?;

    let eig_path = format!("{}.eigenvalues.tsv", args.output_prefix);
    let mut out = create_output(&eig_path)?;
    pcs.write_eigenvalues(&mut out)?;
    out.flush()?;

    for (label, share) in pcs.labels.iter().zip(&pcs.variance_explained) {
        info!("{}: {:.2}% of kinship variance", label, 100.0 * share);
    }
    info!("Wrote {} and {}", scores_path, eig_path);
    Ok(())
}
