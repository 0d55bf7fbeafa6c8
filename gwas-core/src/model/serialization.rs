//! Model serialization and deserialization.
//!
//! Uses bincode for a compact binary file; the magic bytes and version are
//! the first fields of the payload. Optional JSON sidecar for inspection.

use anyhow::{bail, Result};
use std::path::Path;

use super::null_model::NullModel;

/// Save a null model to a binary file (.gwas.model).
pub fn save_model(model: &NullModel, path: &Path) -> Result<()> {
    let encoded = bincode::serialize(model)?;
    std::fs::write(path, &encoded)?;
    Ok(())
}

/// Load a null model from a binary file and validate it.
pub fn load_model(path: &Path) -> Result<NullModel> {
    let data = std::fs::read(path)?;
    if data.len() < 4 || data[..4] != NullModel::MAGIC {
        bail!(
            "Invalid model file {}: expected magic bytes {:?}",
            path.display(),
            NullModel::MAGIC
        );
    }
    let model: NullModel = bincode::deserialize(&data)?;
    model.validate()?;
    Ok(model)
}

/// Save a JSON sidecar for debugging (.gwas.model.json).
pub fn save_model_json(model: &NullModel, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Summary of a null model (for display).
pub fn model_summary(model: &NullModel) -> String {
    let vc = &model.variance_components;
    let n_zero = model.eigenvalues.iter().filter(|&&v| v == 0.0).count();
    format!(
        "GWAS Null Model v{}\n\
         Samples: {}\n\
         sigma_g2: {:.6}\n\
         sigma_e2: {:.6}\n\
         delta: {:.6e}\n\
         h2: {:.4}\n\
         REML logL: {:.4}\n\
         Zero eigenvalues: {}",
        model.version,
        model.n_samples(),
        vc.sigma_g2,
        vc.sigma_e2,
        vc.delta,
        vc.h2,
        vc.reml_log_likelihood,
        n_zero,
    )
}
