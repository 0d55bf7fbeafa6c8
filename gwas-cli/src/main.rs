//! gwas-rs: mixed-model genome-wide association with kinship correction.
//!
//! CLI entry point using clap for argument parsing.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gwas",
    version,
    about = "GWAS-RS: linear mixed-model association with GCTA kinship",
    long_about = "Genome-wide association for quantitative traits.\n\
                   Estimates kinship from genotypes, repairs it to PSD, fits REML variance\n\
                   components once and tests every marker by GLS (P3D)."
)]
struct Cli {
    /// Number of threads to use (0 = all cores)
    #[arg(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the kinship matrix (raw and PSD-repaired)
    Kinship(commands::kinship::KinshipArgs),

    /// Principal components of the kinship matrix
    Pca(commands::pca::PcaArgs),

    /// Run mixed-model and/or naive association tests
    Assoc(commands::assoc::AssocArgs),

    /// Print a summary of a saved null model
    ModelSummary(commands::model_summary::ModelSummaryArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .ok();

    tracing::info!("GWAS-RS v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using {} threads", rayon::current_num_threads());

    match cli.command {
        Commands::Kinship(args) => commands::kinship::run(args),
        Commands::Pca(args) => commands::pca::run(args),
        Commands::Assoc(args) => commands::assoc::run(args),
        Commands::ModelSummary(args) => commands::model_summary::run(args),
    }
}
