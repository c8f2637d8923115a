// ==============================================================================
// validator.rs - Downloaded VCF Validation
// ==============================================================================
// Description: Verifies that a downloaded database is a bgzipped VCF and reads
//              the header metadata recorded in the install manifest
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - BGZF is a series of gzip members, so a multi-member decoder reads it
// ==============================================================================

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{GladeError, Result};

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Fixed VCF columns before any sample columns
const FIXED_COLUMNS: usize = 9;

/// Metadata read from a VCF header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcfHeader {
    /// e.g. "VCFv4.1"
    pub file_format: String,
    pub file_date: Option<String>,
    /// Assembly named in `##reference=` (e.g. "GRCh38")
    pub reference: Option<String>,
    pub source: Option<String>,
    /// Sample columns after FORMAT
    pub sample_count: usize,
}

/// Reference genome build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeBuild {
    GRCh37,
    GRCh38,
}

impl GenomeBuild {
    /// Recognise common spellings of a build name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.contains("grch37") || name.contains("hg19") || name.contains("b37") {
            Some(GenomeBuild::GRCh37)
        } else if name.contains("grch38") || name.contains("hg38") {
            Some(GenomeBuild::GRCh38)
        } else {
            None
        }
    }
}

pub struct VcfValidator {
    /// Meta lines scanned before giving up on finding `#CHROM`
    max_header_lines: usize,
}

impl Default for VcfValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl VcfValidator {
    pub fn new() -> Self {
        Self {
            max_header_lines: 100_000,
        }
    }

    pub fn with_max_header_lines(mut self, max: usize) -> Self {
        self.max_header_lines = max;
        self
    }

    /// Check gzip framing and parse the VCF header of `path`
    pub fn inspect(&self, path: &Path) -> Result<VcfHeader> {
        let invalid = |reason: String| GladeError::InvalidVcf {
            path: path.to_path_buf(),
            reason,
        };

        let magic = self.read_magic_number(path)?;
        if !verify_magic_number(&GZIP_MAGIC, &magic) {
            return Err(invalid("not gzip compressed".to_string()));
        }

        let reader = BufReader::new(MultiGzDecoder::new(File::open(path)?));
        let mut lines = reader.lines();

        let first_line = lines
            .next()
            .ok_or_else(|| invalid("file is empty".to_string()))?
            .map_err(|e| invalid(e.to_string()))?;

        let file_format = first_line
            .strip_prefix("##fileformat=")
            .filter(|format| format.starts_with("VCFv4."))
            .ok_or_else(|| invalid("missing ##fileformat=VCFv4.x header".to_string()))?;

        let mut header = VcfHeader {
            file_format: file_format.to_string(),
            ..VcfHeader::default()
        };

        for line in lines.take(self.max_header_lines) {
            let line = line.map_err(|e| invalid(e.to_string()))?;

            if let Some(meta) = line.strip_prefix("##") {
                if let Some((key, value)) = meta.split_once('=') {
                    match key {
                        "fileDate" => header.file_date = Some(value.to_string()),
                        "reference" => header.reference = Some(value.to_string()),
                        "source" => header.source = Some(value.to_string()),
                        _ => {}
                    }
                }
            } else if line.starts_with("#CHROM") {
                header.sample_count = line.split('\t').count().saturating_sub(FIXED_COLUMNS);
                debug!("VCF header for {}: {:?}", path.display(), header);
                return Ok(header);
            } else {
                break;
            }
        }

        Err(invalid("missing #CHROM header line".to_string()))
    }

    fn read_magic_number(&self, path: &Path) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(GZIP_MAGIC.len());
        File::open(path)?
            .take(GZIP_MAGIC.len() as u64)
            .read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

fn verify_magic_number(expected: &[u8], actual: &[u8]) -> bool {
    expected.len() <= actual.len() && expected.iter().zip(actual.iter()).all(|(e, a)| e == a)
}

/// Whether a header's `##reference` agrees with the requested genome version
///
/// Unrecognised or absent names on either side count as a match.
pub fn reference_matches(reference: Option<&str>, genome_version: &str) -> bool {
    match (
        reference.and_then(GenomeBuild::from_name),
        GenomeBuild::from_name(genome_version),
    ) {
        (Some(found), Some(wanted)) => found == wanted,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CLINVAR_HEADER: &str = "##fileformat=VCFv4.1\n\
##fileDate=2024-01-07\n\
##source=ClinVar\n\
##reference=GRCh38\n\
##INFO=<ID=CLNSIG,Number=.,Type=String,Description=\"Clinical significance\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
1\t69134\t2205837\tA\tG\t.\t.\tCLNSIG=Likely_benign\n";

    fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_inspect_clinvar_header() {
        let file = write_temp(&gzip(CLINVAR_HEADER.as_bytes()));

        let header = VcfValidator::new().inspect(file.path()).unwrap();
        assert_eq!(header.file_format, "VCFv4.1");
        assert_eq!(header.file_date.as_deref(), Some("2024-01-07"));
        assert_eq!(header.reference.as_deref(), Some("GRCh38"));
        assert_eq!(header.source.as_deref(), Some("ClinVar"));
        assert_eq!(header.sample_count, 0);
    }

    #[test]
    fn test_inspect_multi_member_gzip() {
        // BGZF-style: header and body in separate gzip members
        let (meta, body) = CLINVAR_HEADER.split_at(CLINVAR_HEADER.find("#CHROM").unwrap());
        let mut bytes = gzip(meta.as_bytes());
        bytes.extend(gzip(format!("{}\tFORMAT\tNA12878", body.lines().next().unwrap()).as_bytes()));
        let file = write_temp(&bytes);

        let header = VcfValidator::new().inspect(file.path()).unwrap();
        assert_eq!(header.reference.as_deref(), Some("GRCh38"));
        assert_eq!(header.sample_count, 1);
    }

    #[test]
    fn test_rejects_plain_text() {
        let file = write_temp(CLINVAR_HEADER.as_bytes());

        let err = VcfValidator::new().inspect(file.path()).unwrap_err();
        assert!(matches!(err, GladeError::InvalidVcf { reason, .. } if reason.contains("gzip")));
    }

    #[test]
    fn test_rejects_missing_fileformat() {
        let file = write_temp(&gzip(b"#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));

        assert!(matches!(
            VcfValidator::new().inspect(file.path()),
            Err(GladeError::InvalidVcf { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_chrom_line() {
        let file = write_temp(&gzip(
            b"##fileformat=VCFv4.2\n##reference=GRCh37\n1\t100\t.\tA\tG\n",
        ));

        let err = VcfValidator::new().inspect(file.path()).unwrap_err();
        assert!(matches!(err, GladeError::InvalidVcf { reason, .. } if reason.contains("#CHROM")));
    }

    #[test]
    fn test_header_line_limit() {
        let file = write_temp(&gzip(CLINVAR_HEADER.as_bytes()));

        assert!(VcfValidator::new()
            .with_max_header_lines(2)
            .inspect(file.path())
            .is_err());
    }

    #[test]
    fn test_reference_matches() {
        assert!(reference_matches(Some("GRCh38"), "GRCh38"));
        assert!(reference_matches(Some("hg19"), "GRCh37"));
        assert!(reference_matches(Some("file:///ref/GRCh37.primary_assembly.fa"), "GRCh37"));
        assert!(!reference_matches(Some("GRCh37"), "GRCh38"));
        assert!(reference_matches(None, "GRCh38"));
        assert!(reference_matches(Some("GRCh38"), "T2T-CHM13"));
    }
}
