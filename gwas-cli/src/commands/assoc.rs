//! Association scan.
//!
//! gwas assoc --plink-file ... --pheno-file ... --pheno-col ... --output-prefix ...
//! gwas assoc --plink-file ... --model-file prefix.gwas.model --output-prefix ...
//!
//! Without a model file the null model is fitted from the same genotypes,
//! unless `--method linear` asks for the naive scan alone. With one, the
//! saved variance components and kinship eigenbasis are reused and only the
//! marker scan runs.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use gwas_core::assoc::naive::NaiveLinearGwas;
use gwas_core::assoc::report::GwasReport;
use gwas_core::assoc::AssocConfig;
use gwas_core::lmm::{MixedModelGwas, RemlConfig};
use gwas_core::model::{load_model, save_model, save_model_json};
use gwas_core::pipeline::{run_naive_pipeline, run_pipeline, PipelineConfig};
use gwas_core::qc::{align_to_samples, filter_markers_by_maf, QcConfig};
use gwas_core::spectral::SpectralConfig;

use super::{create_output, GenotypeInput, PhenotypeInput};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Method {
    /// Mixed model with kinship (P3D)
    Lmm,
    /// Ordinary least squares, no kinship
    Linear,
    /// Both
    Both,
}

#[derive(Args)]
pub struct AssocArgs {
    #[command(flatten)]
    genotypes: GenotypeInput,

    #[command(flatten)]
    phenotype: PhenotypeInput,

    /// Saved null model; skips kinship and REML
    #[arg(long, conflicts_with = "pheno_file")]
    model_file: Option<String>,

    /// Which test(s) to run
    #[arg(long, value_enum, default_value = "both")]
    method: Method,

    /// Minimum MAF for tested markers
    #[arg(long, default_value = "0.05")]
    min_maf: f64,

    /// Minimum non-missing samples per marker
    #[arg(long, default_value = "3")]
    min_observations: usize,

    /// Minimum count of the rarest observed dosage per marker
    #[arg(long, default_value = "1")]
    min_genotype_count: usize,

    /// Family-wise error rate for the Bonferroni threshold
    #[arg(long, default_value = "0.05")]
    alpha: f64,

    /// Eigenvalues below this are clamped to zero
    #[arg(long, default_value = "1e-8")]
    zero_tolerance: f64,

    /// Number of log10(delta) grid intervals for REML
    #[arg(long, default_value = "100")]
    reml_grid_points: usize,

    /// Save the fitted null model (.gwas.model)
    #[arg(long)]
    save_model: Option<String>,

    /// Also save JSON sidecar for debugging
    #[arg(long, default_value = "false")]
    save_json: bool,

    /// Output file prefix
    #[arg(long)]
    output_prefix: String,
}

pub fn run(args: AssocArgs) -> Result<()> {
    info!("=== GWAS-RS: Association ===");
    let assoc = AssocConfig {
        min_observations: args.min_observations,
        min_minor_genotype_count: args.min_genotype_count,
    };
    let genotypes = args.genotypes.load()?;

    let (model, mixed, naive) = match &args.model_file {
        Some(path) => {
            let saved = load_model(Path::new(path))?;
            info!("Loaded null model for {} samples from {}", saved.n_samples(), path);
            let g = align_to_samples(&genotypes, &saved.sample_ids)?;
            let g = filter_markers_by_maf(&g, args.min_maf)?;
            let model = MixedModelGwas::from_null_model(&saved, assoc.clone())?;
            let mixed = match args.method {
                Method::Linear => None,
                _ => Some(model.run(&g)?),
            };
            let naive = match args.method {
                Method::Lmm => None,
                _ => Some(NaiveLinearGwas::new(saved.phenotype.clone(), assoc).run(&g)?),
            };
            (Some(model), mixed, naive)
        }
        None => {
            let Some(pheno) = args.phenotype.load()? else {
                anyhow::bail!("--pheno-file is required unless --model-file is given");
            };
            let config = PipelineConfig {
                qc: QcConfig {
                    min_maf: args.min_maf,
                },
                spectral: SpectralConfig {
                    zero_tolerance: args.zero_tolerance,
                },
                reml: RemlConfig {
                    grid_points: args.reml_grid_points,
                    ..RemlConfig::default()
                },
                assoc,
                alpha: args.alpha,
                run_naive: args.method != Method::Lmm,
                ..PipelineConfig::default()
            };
            if args.method == Method::Linear {
                let (_, naive) = run_naive_pipeline(&genotypes, &pheno, &config)?;
                (None, None, Some(naive))
            } else {
                let out = run_pipeline(&genotypes, &pheno, &config)?;
                (Some(out.model), Some(out.mixed), out.naive)
            }
        }
    };

    if let Some(model) = &model {
        let vc = model.variance_components();
        info!(
            "Null model: h2 = {:.4}, sigma_g2 = {:.4e}, sigma_e2 = {:.4e}",
            vc.h2, vc.sigma_g2, vc.sigma_e2
        );
    }

    match (&args.save_model, &model) {
        (Some(path), None) => {
            warn!("No null model was fitted for --method linear; not writing {}", path);
        }
        (Some(path), Some(model)) => {
            let saved = model.null_model(args.zero_tolerance);
            save_model(&saved, Path::new(path))?;
            info!("Null model saved to {}", path);
            if args.save_json {
                let json_path = format!("{}.json", path);
                save_model_json(&saved, Path::new(&json_path))?;
                info!("JSON sidecar saved to {}", json_path);
            }
        }
        (None, _) => {}
    }

    for report in mixed.iter().chain(naive.iter()) {
        write_report(report, &args.output_prefix, args.alpha)?;
    }
    Ok(())
}

fn write_report(report: &GwasReport, prefix: &str, alpha: f64) -> Result<()> {
    let path = format!("{}.{}.tsv", prefix, report.method());
    let mut out = create_output(&path)?;
    report.write_tsv(&mut out)?;
    out.flush()?;

    let threshold = report.bonferroni_threshold(alpha);
    println!("[{}] results: {}", report.method(), path);
    println!(
        "[{}] tested: {}, untestable: {}",
        report.method(),
        report.n_tested(),
        report.n_untestable()
    );
    match threshold {
        Some(t) => println!(
            "[{}] Bonferroni threshold ({} / {}): {:.3e}, significant: {}",
            report.method(),
            alpha,
            report.n_tested(),
            t,
            report.significant(alpha).len()
        ),
        None => println!("[{}] no testable markers", report.method()),
    }
    if let Some(lambda) = report.genomic_inflation() {
        println!("[{}] genomic inflation: {:.3}", report.method(), lambda);
    }
    Ok(())
}
