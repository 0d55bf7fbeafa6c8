//! Sample-keyed quantitative trait and its TSV parser.
//!
//! Reads tab/space-delimited files with a sample ID column and a named
//! trait column. Missing values stay missing (`None`), they are never
//! coerced to zero.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::error::GenoError;

/// Trait values keyed by sample ID, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct PhenotypeVector {
    sample_ids: Vec<String>,
    values: Vec<Option<f64>>,
    index: HashMap<String, usize>,
}

impl PhenotypeVector {
    /// Build from parallel ID/value vectors. IDs must be unique.
    pub fn new(sample_ids: Vec<String>, values: Vec<Option<f64>>) -> Result<Self, GenoError> {
        if sample_ids.len() != values.len() {
            return Err(GenoError::DimensionMismatch {
                what: "phenotype values",
                expected: sample_ids.len(),
                got: values.len(),
            });
        }
        let mut index = HashMap::with_capacity(sample_ids.len());
        for (i, id) in sample_ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(GenoError::DuplicateId {
                    kind: "phenotype sample",
                    id: id.clone(),
                });
            }
        }
        Ok(Self {
            sample_ids,
            values,
            index,
        })
    }

    /// Build from `(id, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, GenoError>
    where
        I: IntoIterator<Item = (S, Option<f64>)>,
        S: Into<String>,
    {
        let (ids, values): (Vec<String>, Vec<Option<f64>>) =
            pairs.into_iter().map(|(s, v)| (s.into(), v)).unzip();
        Self::new(ids, values)
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Value for a sample; outer `None` if the ID is unknown, inner if missing.
    pub fn get(&self, id: &str) -> Option<Option<f64>> {
        self.index.get(id).map(|&i| self.values[i])
    }

    /// Iterate `(id, value)` in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.sample_ids
            .iter()
            .zip(self.values.iter())
            .map(|(id, v)| (id.as_str(), *v))
    }

    /// Number of samples with a measured value.
    pub fn n_observed(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Parse a phenotype file.
///
/// # Arguments
/// - `path`: Path to the TSV file
/// - `pheno_col`: Name of the trait column
/// - `sample_id_col`: Name of the sample ID column (default: "IID")
pub fn parse_phenotype_file(
    path: &Path,
    pheno_col: &str,
    sample_id_col: &str,
) -> Result<PhenotypeVector> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read phenotype file: {}", path.display()))?;

    let mut lines = contents.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty phenotype file"))?;

    // Detect delimiter
    let delim = if header_line.contains('\t') { '\t' } else { ' ' };
    let split = |line: &str| -> Vec<String> {
        if delim == '\t' {
            line.split('\t').map(|s| s.trim().to_string()).collect()
        } else {
            line.split_whitespace().map(String::from).collect()
        }
    };

    let headers = split(header_line);
    let id_idx = headers
        .iter()
        .position(|h| h == sample_id_col)
        .ok_or_else(|| {
            anyhow::anyhow!("Sample ID column '{}' not found in header", sample_id_col)
        })?;
    let pheno_idx = headers
        .iter()
        .position(|h| h == pheno_col)
        .ok_or_else(|| anyhow::anyhow!("Phenotype column '{}' not found in header", pheno_col))?;

    let mut sample_ids = Vec::new();
    let mut values = Vec::new();
    for (line_num, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split(line);
        if fields.len() <= id_idx.max(pheno_idx) {
            bail!(
                "Line {} has too few fields (expected at least {})",
                line_num + 2,
                id_idx.max(pheno_idx) + 1
            );
        }
        sample_ids.push(fields[id_idx].clone());
        values.push(parse_value(&fields[pheno_idx]).with_context(|| {
            format!(
                "Line {}: invalid value '{}' in column '{}'",
                line_num + 2,
                fields[pheno_idx],
                pheno_col
            )
        })?);
    }

    Ok(PhenotypeVector::new(sample_ids, values)?)
}

/// Parse a trait value, treating NA markers as missing.
fn parse_value(s: &str) -> Result<Option<f64>> {
    match s {
        "NA" | "na" | "Na" | "." | "" | "-" | "NaN" | "nan" => Ok(None),
        _ => {
            let v: f64 = s.parse()?;
            Ok(v.is_finite().then_some(v))
        }
    }
}
