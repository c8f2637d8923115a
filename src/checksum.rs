// ==============================================================================
// checksum.rs - MD5 Sidecar Parsing and File Hashing
// ==============================================================================
// Description: Parses published MD5 sidecars and hashes downloaded files
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Sidecar format (md5sum output):
//   5d41402abc4b2a76b9719d911017c592  clinvar_20240107.vcf.gz
// ==============================================================================

use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{GladeError, Result};

const HASH_BUFFER_SIZE: usize = 8192;

/// Expected hash and release date taken from an MD5 sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Md5Manifest {
    /// Lowercase hex MD5 of the VCF
    pub hash: String,
    /// Release date (YYYYMMDD)
    pub date: String,
}

/// Parse an MD5 sidecar into the expected hash and the release date
///
/// The date comes from the first `_`-separated part of the published file
/// name that starts with eight digits. Sidecars without a dated file name
/// fall back to today's date.
pub fn parse_md5_file(content: &str) -> Result<Md5Manifest> {
    let mut parts = content.split_whitespace();

    let (hash, path) = match (parts.next(), parts.next()) {
        (Some(hash), Some(path)) => (hash, path),
        _ => {
            return Err(GladeError::InvalidMd5File(
                "expected '<hash> <file name>'".to_string(),
            ))
        }
    };

    if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GladeError::InvalidMd5File(format!(
            "'{}' is not an MD5 digest",
            hash
        )));
    }

    let date = release_date(path).unwrap_or_else(|| Local::now().format("%Y%m%d").to_string());

    Ok(Md5Manifest {
        hash: hash.to_ascii_lowercase(),
        date,
    })
}

fn release_date(path: &str) -> Option<String> {
    let filename = path.rsplit('/').next()?;
    if !filename.contains('_') {
        return None;
    }

    filename
        .split('_')
        .find(|part| part.len() >= 8 && part.bytes().take(8).all(|b| b.is_ascii_digit()))
        .map(|part| part[..8].to_string())
}

/// Streaming MD5 of a file, lowercase hex
pub fn calculate_md5(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}

pub fn verify_md5(path: &Path, expected: &str) -> Result<bool> {
    let actual = calculate_md5(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// Streaming SHA-256 of a file, lowercase hex
pub fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
