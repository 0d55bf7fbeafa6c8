//! gwas-geno: Genotype and phenotype data for gwas-rs
//!
//! Provides the in-memory `GenotypeMatrix` (hard calls with a distinct
//! missing code, marker metadata kept column-aligned), the sample-keyed
//! `PhenotypeVector`, and readers for PLINK bed/bim/fam, plain-text
//! dosage tables and phenotype tables.

pub mod dosage_table;
pub mod error;
pub mod genotype;
pub mod phenotype;
pub mod plink;
pub mod traits;

pub use error::GenoError;
pub use genotype::{GenotypeMatrix, MISSING};
pub use phenotype::PhenotypeVector;
pub use traits::{GenotypeSource, MarkerInfo};
