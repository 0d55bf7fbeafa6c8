//! Print a summary of a saved null model.
//!
//! gwas model-summary --model-file ...

use anyhow::Result;
use clap::Args;

use gwas_core::model::{load_model, model_summary};

#[derive(Args)]
pub struct ModelSummaryArgs {
    /// Model file from `gwas assoc --save-model` (.gwas.model)
    #[arg(long)]
    model_file: String,
}

pub fn run(args: ModelSummaryArgs) -> Result<()> {
    let model = load_model(std::path::Path::new(&args.model_file))?;
    println!("Model: {}", args.model_file);
    println!("{}", model_summary(&model));
    Ok(())
}
