//! PLINK bed/bim/fam reader using memory-mapped files.
//!
//! PLINK binary format consists of three files:
//! - .bed: Binary genotype data (2 bits per genotype, packed)
//! - .bim: Variant information (chrom, id, cm, pos, a1, a2)
//! - .fam: Sample information (fid, iid, father, mother, sex, pheno)
//!
//! The A1 allele is counted, so a homozygous A1/A1 call has dosage 2.
//!
//! Reference: https://www.cog-genomics.org/plink/1.9/formats#bed

use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use tracing::info;

use crate::genotype::MISSING;
use crate::traits::{GenotypeSource, MarkerInfo};

/// PLINK BIM file entry (one per variant).
#[derive(Debug, Clone)]
pub struct BimEntry {
    pub chrom: String,
    pub id: String,
    pub pos: u64,
    pub allele1: String,
    pub allele2: String,
}

/// Reader for PLINK bed/bim/fam files.
pub struct PlinkReader {
    /// Memory-mapped .bed file.
    mmap: Mmap,
    /// Variant information from .bim file.
    bim: Vec<BimEntry>,
    /// Sample IDs (IID column of the .fam file).
    sample_ids: Vec<String>,
    /// Number of bytes per marker in the bed file.
    bytes_per_marker: usize,
}

impl PlinkReader {
    /// Open PLINK files from a base path (without extension).
    /// Will look for .bed, .bim, .fam files.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base = base_path.as_ref();
        let bed_path = base.with_extension("bed");
        let bim_path = base.with_extension("bim");
        let fam_path = base.with_extension("fam");

        let sample_ids = Self::parse_fam(&fam_path)?;
        let bim = Self::parse_bim(&bim_path)?;

        let bed_file = std::fs::File::open(&bed_path)
            .with_context(|| format!("Failed to open bed file: {}", bed_path.display()))?;
        // SAFETY: the mapping is read-only and the file is not modified while
        // the reader is alive.
        let mmap = unsafe { Mmap::map(&bed_file)? };

        if mmap.len() < 3 {
            bail!("Bed file too small");
        }
        if mmap[0] != 0x6C || mmap[1] != 0x1B {
            bail!("Invalid PLINK bed file magic number");
        }
        if mmap[2] != 0x01 {
            bail!("Only SNP-major bed files are supported (mode byte = 0x01)");
        }

        let bytes_per_marker = sample_ids.len().div_ceil(4);
        let expected_size = 3 + bytes_per_marker * bim.len();
        if mmap.len() < expected_size {
            bail!(
                "Bed file too small: expected at least {} bytes, got {}",
                expected_size,
                mmap.len()
            );
        }

        info!(
            "Opened PLINK fileset {}: {} samples, {} markers",
            base.display(),
            sample_ids.len(),
            bim.len()
        );

        Ok(Self {
            mmap,
            bim,
            sample_ids,
            bytes_per_marker,
        })
    }

    /// Parse a .fam file, returning the IID column.
    fn parse_fam(path: &Path) -> Result<Vec<String>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fam file: {}", path.display()))?;
        let mut ids = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                bail!("Fam file line {} has fewer than 6 fields", line_num + 1);
            }
            ids.push(fields[1].to_string());
        }
        Ok(ids)
    }

    /// Parse a .bim file.
    fn parse_bim(path: &Path) -> Result<Vec<BimEntry>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bim file: {}", path.display()))?;
        let mut entries = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                bail!("Bim file line {} has fewer than 6 fields", line_num + 1);
            }
            let pos = fields[3].parse().with_context(|| {
                format!("Bim file line {}: invalid position '{}'", line_num + 1, fields[3])
            })?;
            entries.push(BimEntry {
                chrom: fields[0].to_string(),
                id: fields[1].to_string(),
                pos,
                allele1: fields[4].to_string(),
                allele2: fields[5].to_string(),
            });
        }
        Ok(entries)
    }

    /// Decode a single genotype from the bed file.
    /// Returns the A1 dosage code: 0, 1, 2, or MISSING.
    #[inline]
    fn decode_genotype(byte: u8, offset: usize) -> u8 {
        match (byte >> (offset * 2)) & 0x03 {
            0b00 => 2,
            0b01 => MISSING,
            0b10 => 1,
            _ => 0,
        }
    }

    /// Get BIM entries.
    pub fn bim(&self) -> &[BimEntry] {
        &self.bim
    }
}

impl GenotypeSource for PlinkReader {
    fn n_markers(&self) -> usize {
        self.bim.len()
    }

    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn marker_info(&self, index: usize) -> Result<MarkerInfo> {
        let bim = self
            .bim
            .get(index)
            .with_context(|| format!("Marker index {} out of range ({})", index, self.bim.len()))?;
        Ok(MarkerInfo::new(bim.id.clone(), bim.chrom.clone(), bim.pos))
    }

    fn read_marker(&self, index: usize, out: &mut Vec<u8>) -> Result<()> {
        if index >= self.bim.len() {
            bail!("Marker index {} out of range ({})", index, self.bim.len());
        }
        let offset = 3 + index * self.bytes_per_marker;
        out.clear();
        out.extend((0..self.sample_ids.len()).map(|i| {
            let byte = self.mmap[offset + i / 4];
            Self::decode_genotype(byte, i % 4)
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_genotype() {
        assert_eq!(PlinkReader::decode_genotype(0b00_00_00_00, 0), 2);
        assert_eq!(PlinkReader::decode_genotype(0b00_00_00_01, 0), MISSING);
        assert_eq!(PlinkReader::decode_genotype(0b00_00_00_10, 0), 1);
        assert_eq!(PlinkReader::decode_genotype(0b00_00_00_11, 0), 0);
    }

    #[test]
    fn test_decode_genotype_offsets() {
        let byte: u8 = 0b11_10_01_00; // s3=A2/A2, s2=het, s1=missing, s0=A1/A1
        assert_eq!(PlinkReader::decode_genotype(byte, 0), 2);
        assert_eq!(PlinkReader::decode_genotype(byte, 1), MISSING);
        assert_eq!(PlinkReader::decode_genotype(byte, 2), 1);
        assert_eq!(PlinkReader::decode_genotype(byte, 3), 0);
    }

    #[test]
    fn test_read_fileset() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("toy");

        let mut fam = std::fs::File::create(base.with_extension("fam")).unwrap();
        for i in 1..=5 {
            writeln!(fam, "F{i} S{i} 0 0 1 -9").unwrap();
        }
        let mut bim = std::fs::File::create(base.with_extension("bim")).unwrap();
        writeln!(bim, "1\trs1\t0\t1000\tA\tG").unwrap();
        writeln!(bim, "2\trs2\t0\t2000\tC\tT").unwrap();

        // 5 samples -> 2 bytes per marker
        let bed = [
            0x6C, 0x1B, 0x01,
            0b11_10_01_00, 0b0000_0000, // 2, NA, 1, 0 | 2
            0b11_11_11_11, 0b0000_0010, // 0, 0, 0, 0 | 1
        ];
        std::fs::write(base.with_extension("bed"), bed).unwrap();

        let reader = PlinkReader::new(&base).unwrap();
        assert_eq!(reader.n_markers(), 2);
        assert_eq!(reader.sample_ids().len(), 5);
        assert_eq!(reader.marker_info(1).unwrap().chrom, "2");

        let g = reader.load_matrix().unwrap();
        assert_eq!(g.marker(0), &[2, MISSING, 1, 0, 2]);
        assert_eq!(g.marker(1), &[0, 0, 0, 0, 1]);
        assert_eq!(g.markers()[0].pos, 1000);
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("bad");
        std::fs::write(base.with_extension("fam"), "F S 0 0 1 -9\n").unwrap();
        std::fs::write(base.with_extension("bim"), "1 rs1 0 1 A G\n").unwrap();
        std::fs::write(base.with_extension("bed"), [0u8, 0, 1, 0]).unwrap();
        assert!(PlinkReader::new(&base).is_err());
    }
}
