//! Core traits for genotype reading.

use anyhow::Result;

use crate::genotype::GenotypeMatrix;

/// Information about a genetic marker (variant).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInfo {
    /// Marker/variant ID (e.g. rsID).
    pub id: String,
    /// Chromosome (e.g. "1", "22", "X").
    pub chrom: String,
    /// Position in base pairs.
    pub pos: u64,
}

impl MarkerInfo {
    pub fn new(id: impl Into<String>, chrom: impl Into<String>, pos: u64) -> Self {
        Self {
            id: id.into(),
            chrom: chrom.into(),
            pos,
        }
    }
}

/// A source of hard-call genotypes.
///
/// Each on-disk format implements the per-marker accessors; loading the
/// whole matrix is shared.
pub trait GenotypeSource {
    /// Total number of markers in the source.
    fn n_markers(&self) -> usize;

    /// Sample IDs, in source order.
    fn sample_ids(&self) -> &[String];

    /// Get marker info without reading genotype data.
    fn marker_info(&self, index: usize) -> Result<MarkerInfo>;

    /// Decode marker `index` into `out` as one code per sample
    /// (0, 1, 2 or [`crate::MISSING`]).
    fn read_marker(&self, index: usize, out: &mut Vec<u8>) -> Result<()>;

    /// Read every marker into an in-memory [`GenotypeMatrix`].
    fn load_matrix(&self) -> Result<GenotypeMatrix> {
        let n = self.sample_ids().len();
        let p = self.n_markers();
        let mut markers = Vec::with_capacity(p);
        let mut data = Vec::with_capacity(n * p);
        let mut buf = Vec::with_capacity(n);
        for j in 0..p {
            markers.push(self.marker_info(j)?);
            self.read_marker(j, &mut buf)?;
            data.extend_from_slice(&buf);
        }
        Ok(GenotypeMatrix::new(
            self.sample_ids().to_vec(),
            markers,
            data,
        )?)
    }
}
