// ==============================================================================
// error.rs - Library Error Types
// ==============================================================================
// Description: Error taxonomy for catalog, download, checksum and store operations
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GladeError>;

#[derive(Error, Debug)]
pub enum GladeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request for {url} failed with status: {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database '{0}' not found in catalog")]
    UnknownDatabase(String),

    #[error("Genome version '{genome_version}' not found for database '{database}'")]
    UnknownGenomeVersion {
        database: String,
        genome_version: String,
    },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid MD5 file format: {0}")]
    InvalidMd5File(String),

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Invalid VCF file {path}: {reason}")]
    InvalidVcf { path: PathBuf, reason: String },

    #[error("Database '{database}' ({genome_version}) is not installed")]
    NotInstalled {
        database: String,
        genome_version: String,
    },

    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    #[error("Symlinks not supported on this platform")]
    SymlinkUnsupported,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GladeError {
    /// Whether a failed request is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            GladeError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            GladeError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_transient_only_for_server_side() {
        let server = GladeError::HttpStatus {
            url: "https://example.org/a".to_string(),
            status: 503,
        };
        let client = GladeError::HttpStatus {
            url: "https://example.org/a".to_string(),
            status: 404,
        };

        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(!GladeError::HomeDirUnavailable.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = GladeError::UnknownGenomeVersion {
            database: "clinvar".to_string(),
            genome_version: "GRCh36".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Genome version 'GRCh36' not found for database 'clinvar'"
        );
    }
}
