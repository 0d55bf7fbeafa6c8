//! In-memory hard-call genotype matrix.
//!
//! Dosages are stored as `u8` codes in marker-major order so a marker's
//! column is one contiguous slice. Missing calls use the [`MISSING`] code
//! and are never coerced to a number; callers get `Option<u8>` back.

use std::collections::HashSet;

use crate::error::GenoError;
use crate::traits::MarkerInfo;

/// Code for a missing genotype call.
pub const MISSING: u8 = u8::MAX;

/// Return `true` for the four valid codes: 0, 1, 2 and [`MISSING`].
#[inline]
pub fn is_valid_code(code: u8) -> bool {
    code <= 2 || code == MISSING
}

/// n samples x p markers of alt-allele counts.
///
/// Marker metadata lives inside the matrix so that dropping a column drops
/// its metadata in the same operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeMatrix {
    sample_ids: Vec<String>,
    markers: Vec<MarkerInfo>,
    /// `data[j * n_samples + i]` = code for sample i at marker j.
    data: Vec<u8>,
}

impl GenotypeMatrix {
    /// Build from marker-major codes, validating every entry and the
    /// uniqueness of sample and marker identifiers.
    pub fn new(
        sample_ids: Vec<String>,
        markers: Vec<MarkerInfo>,
        data: Vec<u8>,
    ) -> Result<Self, GenoError> {
        let n = sample_ids.len();
        let expected = n * markers.len();
        if data.len() != expected {
            return Err(GenoError::DimensionMismatch {
                what: "genotype codes",
                expected,
                got: data.len(),
            });
        }
        check_unique("sample", sample_ids.iter())?;
        check_unique("marker", markers.iter().map(|m| &m.id))?;

        if let Some(pos) = data.iter().position(|&c| !is_valid_code(c)) {
            return Err(GenoError::InvalidDosage {
                sample: pos % n.max(1),
                marker: pos / n.max(1),
                code: data[pos],
            });
        }

        Ok(Self {
            sample_ids,
            markers,
            data,
        })
    }

    /// Build from one row per sample, `None` marking a missing call.
    pub fn from_sample_rows(
        sample_ids: Vec<String>,
        markers: Vec<MarkerInfo>,
        rows: &[Vec<Option<u8>>],
    ) -> Result<Self, GenoError> {
        let n = sample_ids.len();
        let p = markers.len();
        if rows.len() != n {
            return Err(GenoError::DimensionMismatch {
                what: "sample rows",
                expected: n,
                got: rows.len(),
            });
        }
        let mut data = vec![MISSING; n * p];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != p {
                return Err(GenoError::DimensionMismatch {
                    what: "markers in sample row",
                    expected: p,
                    got: row.len(),
                });
            }
            for (j, g) in row.iter().enumerate() {
                data[j * n + i] = g.unwrap_or(MISSING);
            }
        }
        Self::new(sample_ids, markers, data)
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_markers(&self) -> usize {
        self.markers.len()
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn markers(&self) -> &[MarkerInfo] {
        &self.markers
    }

    /// Raw codes of marker `j` across all samples.
    pub fn marker(&self, j: usize) -> &[u8] {
        let n = self.n_samples();
        &self.data[j * n..(j + 1) * n]
    }

    /// New matrix with only the given sample rows, in the given order.
    pub fn select_samples(&self, rows: &[usize]) -> Result<Self, GenoError> {
        let n = self.n_samples();
        if let Some(&bad) = rows.iter().find(|&&i| i >= n) {
            return Err(GenoError::OutOfRange {
                what: "sample",
                index: bad,
                len: n,
            });
        }
        let ids: Vec<String> = rows.iter().map(|&i| self.sample_ids[i].clone()).collect();
        let mut data = Vec::with_capacity(rows.len() * self.n_markers());
        for j in 0..self.n_markers() {
            let col = self.marker(j);
            data.extend(rows.iter().map(|&i| col[i]));
        }
        Self::new(ids, self.markers.clone(), data)
    }

    /// New matrix with only the given marker columns (and their metadata).
    pub fn select_markers(&self, cols: &[usize]) -> Result<Self, GenoError> {
        let p = self.n_markers();
        if let Some(&bad) = cols.iter().find(|&&j| j >= p) {
            return Err(GenoError::OutOfRange {
                what: "marker",
                index: bad,
                len: p,
            });
        }
        let markers: Vec<MarkerInfo> = cols.iter().map(|&j| self.markers[j].clone()).collect();
        let mut data = Vec::with_capacity(self.n_samples() * cols.len());
        for &j in cols {
            data.extend_from_slice(self.marker(j));
        }
        Self::new(self.sample_ids.clone(), markers, data)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a String>,
) -> Result<(), GenoError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(GenoError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}
