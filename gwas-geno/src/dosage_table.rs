//! Plain-text dosage table reader.
//!
//! One header line `marker chrom pos <sample1> <sample2> ...` followed by
//! one line per marker with hard-call dosages 0/1/2. `NA`, `.` and `-1`
//! mark missing calls. Tab- or whitespace-delimited.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::genotype::MISSING;
use crate::traits::{GenotypeSource, MarkerInfo};

const META_COLUMNS: usize = 3;

/// Fully parsed dosage table.
pub struct DosageTableReader {
    sample_ids: Vec<String>,
    markers: Vec<MarkerInfo>,
    /// One row of codes per marker.
    rows: Vec<Vec<u8>>,
}

impl DosageTableReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dosage table: {}", path.display()))?;
        let reader = Self::parse(&contents)
            .with_context(|| format!("Invalid dosage table: {}", path.display()))?;
        info!(
            "Read dosage table {}: {} samples, {} markers",
            path.display(),
            reader.sample_ids.len(),
            reader.markers.len()
        );
        Ok(reader)
    }

    /// Parse table contents.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty dosage table"))?;
        let headers: Vec<&str> = header.split_whitespace().collect();
        if headers.len() <= META_COLUMNS {
            bail!("Header must contain 'marker chrom pos' followed by sample IDs");
        }
        let sample_ids: Vec<String> = headers[META_COLUMNS..]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let n = sample_ids.len();

        let mut markers = Vec::new();
        let mut rows = Vec::new();
        for (line_num, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != META_COLUMNS + n {
                bail!(
                    "Line {} has {} fields (expected {})",
                    line_num + 2,
                    fields.len(),
                    META_COLUMNS + n
                );
            }
            let pos: u64 = fields[2].parse().with_context(|| {
                format!("Line {}: invalid position '{}'", line_num + 2, fields[2])
            })?;
            markers.push(MarkerInfo::new(fields[0], fields[1], pos));

            let row = fields[META_COLUMNS..]
                .iter()
                .map(|f| {
                    parse_dosage(f).with_context(|| {
                        format!("Line {}: invalid dosage '{}'", line_num + 2, f)
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            rows.push(row);
        }

        Ok(Self {
            sample_ids,
            markers,
            rows,
        })
    }
}

/// Parse one dosage field to a code.
fn parse_dosage(s: &str) -> Result<u8> {
    match s {
        "NA" | "na" | "." | "-1" => Ok(MISSING),
        "0" => Ok(0),
        "1" => Ok(1),
        "2" => Ok(2),
        _ => bail!("expected 0, 1, 2 or NA"),
    }
}

impl GenotypeSource for DosageTableReader {
    fn n_markers(&self) -> usize {
        self.markers.len()
    }

    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn marker_info(&self, index: usize) -> Result<MarkerInfo> {
        self.markers
            .get(index)
            .cloned()
            .with_context(|| format!("Marker index {} out of range ({})", index, self.markers.len()))
    }

    fn read_marker(&self, index: usize, out: &mut Vec<u8>) -> Result<()> {
        let row = self
            .rows
            .get(index)
            .with_context(|| format!("Marker index {} out of range ({})", index, self.rows.len()))?;
        out.clear();
        out.extend_from_slice(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dosage() {
        assert_eq!(parse_dosage("0").unwrap(), 0);
        assert_eq!(parse_dosage("2").unwrap(), 2);
        assert_eq!(parse_dosage("NA").unwrap(), MISSING);
        assert_eq!(parse_dosage(".").unwrap(), MISSING);
        assert!(parse_dosage("3").is_err());
        assert!(parse_dosage("1.5").is_err());
    }

    #[test]
    fn test_parse_table() {
        let text = "marker\tchrom\tpos\tS1\tS2\tS3\tS4\n\
                    m1\t1\t100\t0\t2\t0\t2\n\
                    m2\t1\t200\t1\t1\t0\t2\n\
                    m3\t2\t300\t2\t0\tNA\t0\n";
        let t = DosageTableReader::parse(text).unwrap();
        let g = t.load_matrix().unwrap();
        assert_eq!(g.n_samples(), 4);
        assert_eq!(g.n_markers(), 3);
        assert_eq!(g.marker(2), &[2, 0, MISSING, 0]);
        assert_eq!(g.markers()[2].chrom, "2");
    }

    #[test]
    fn test_ragged_row_rejected() {
        let text = "marker chrom pos S1 S2\nm1 1 100 0\n";
        assert!(DosageTableReader::parse(text).is_err());
    }

    #[test]
    fn test_duplicate_sample_rejected_on_load() {
        let text = "marker chrom pos S1 S1\nm1 1 100 0 1\n";
        let t = DosageTableReader::parse(text).unwrap();
        assert!(t.load_matrix().is_err());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geno.tsv");
        std::fs::write(&path, "marker chrom pos A B\nrs1 1 5 0 1\n").unwrap();
        let t = DosageTableReader::new(&path).unwrap();
        assert_eq!(t.sample_ids(), &["A".to_string(), "B".to_string()]);
        assert_eq!(t.marker_info(0).unwrap().id, "rs1");
    }
}
