//! gwas-core: statistical core of gwas-rs
//!
//! QC and sample alignment, GCTA kinship, eigendecomposition with PSD
//! repair, principal components, a P3D linear mixed model with REML
//! variance components, a naive OLS baseline, and null-model persistence.

pub mod assoc;
pub mod error;
pub mod kinship;
pub mod lmm;
pub mod model;
pub mod pca;
pub mod pipeline;
pub mod qc;
pub mod spectral;
pub mod util;

pub use assoc::naive::NaiveLinearGwas;
pub use assoc::report::{GwasMethod, GwasReport};
pub use assoc::{AssocConfig, AssociationResult, MarkerOutcome, MarkerTest, UntestableReason};
pub use error::{GwasError, Result};
pub use kinship::{estimate_kinship, KinshipMatrix};
pub use lmm::{MixedModelGwas, RemlConfig, VarianceComponents};
pub use model::NullModel;
pub use pca::PrincipalComponents;
pub use pipeline::{run_naive_pipeline, run_pipeline, PipelineConfig, PipelineOutput};
pub use qc::{run_qc, QcConfig, QcOutput};
pub use spectral::{RepairedKinship, SpectralConfig, SpectralDecomposition};
