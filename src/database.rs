// ==============================================================================
// database.rs - Database Download and Maintenance
// ==============================================================================
// Description: Downloads catalog databases into dated releases, verifies them
//              against published checksums and maintains current symlinks
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Download pipeline:
//   1. Resolve URLs from the catalog
//   2. Fetch MD5 sidecar -> expected hash + release date
//   3. Fetch (or re-verify) VCF, fetch TBI, store sidecar
//   4. Inspect VCF header, write manifest.json
//   5. Point <db>/<version>/<file> symlinks at the new release
// ==============================================================================

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::checksum::{calculate_md5, calculate_sha256, parse_md5_file, verify_md5, Md5Manifest};
use crate::config::{DatabaseCatalog, DatabaseFiles, Settings};
use crate::downloader::Downloader;
use crate::error::{GladeError, Result};
use crate::store::{DatabaseStore, FileKind, InstallManifest};
use crate::validator::{reference_matches, VcfHeader, VcfValidator};

/// What happened to one file during a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Present from an earlier run (VCF checksum confirmed when possible)
    AlreadyPresent,
    Downloaded,
    /// Present but failed checksum verification, fetched again
    Redownloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub kind: FileKind,
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Whether the current symlink now points at this file
    pub linked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub database: String,
    pub genome_version: String,
    pub date: String,
    pub location: PathBuf,
    pub files: Vec<FileReport>,
    pub header: VcfHeader,
    /// `##reference` names a different build than requested
    pub reference_mismatch: bool,
}

/// Catalog entry plus what is installed for it
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStatus {
    pub database: String,
    pub genome_version: String,
    pub files: DatabaseFiles,
    pub location: PathBuf,
    pub installed_dates: Vec<String>,
    pub current_date: Option<String>,
    pub manifest: Option<InstallManifest>,
}

impl DatabaseStatus {
    pub fn is_installed(&self) -> bool {
        self.current_date.is_some() || !self.installed_dates.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub database: String,
    pub genome_version: String,
    pub date: String,
    pub path: PathBuf,
    pub expected: String,
    pub actual: String,
    pub valid: bool,
}

pub struct DatabaseManager {
    store: DatabaseStore,
    catalog: DatabaseCatalog,
    downloader: Downloader,
    validator: VcfValidator,
}

impl DatabaseManager {
    pub fn new(settings: &Settings) -> Result<Self> {
        let catalog = settings.load_catalog()?;
        let downloader = Downloader::from_settings(settings)?;
        Self::with_parts(settings.base_dir.clone(), catalog, downloader)
    }

    pub fn with_parts(
        base_dir: PathBuf,
        catalog: DatabaseCatalog,
        downloader: Downloader,
    ) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;

        Ok(Self {
            store: DatabaseStore::new(base_dir),
            catalog,
            downloader,
            validator: VcfValidator::new(),
        })
    }

    pub fn catalog(&self) -> &DatabaseCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &DatabaseStore {
        &self.store
    }

    pub async fn download_database(
        &self,
        database: &str,
        genome_version: &str,
    ) -> Result<DownloadReport> {
        let urls = self.catalog.lookup(database, genome_version)?;

        info!(
            "Downloading {} database for genome version {}",
            database, genome_version
        );

        let md5_text = self.downloader.download_text(&urls.md5).await?;
        let expected = parse_md5_file(&md5_text)?;
        info!("Release {} (md5 {})", expected.date, expected.hash);

        let dated_dir = self.store.dated_dir(database, genome_version, &expected.date);
        let created = !dated_dir.exists();
        fs::create_dir_all(&dated_dir)?;

        let result = self
            .install_release(database, genome_version, urls, &dated_dir, &md5_text, expected)
            .await;

        if result.is_err() && created {
            warn!("Removing incomplete release {}", dated_dir.display());
            if let Err(e) = fs::remove_dir_all(&dated_dir) {
                warn!("Could not remove {}: {}", dated_dir.display(), e);
            }
        }

        result
    }

    async fn install_release(
        &self,
        database: &str,
        genome_version: &str,
        urls: &DatabaseFiles,
        dated_dir: &Path,
        md5_text: &str,
        expected: Md5Manifest,
    ) -> Result<DownloadReport> {
        let vcf_path = dated_dir.join(FileKind::Vcf.file_name(database));
        let vcf_outcome = self
            .ensure_vcf(&urls.vcf, &vcf_path, &expected.hash)
            .await?;

        let tbi_path = dated_dir.join(FileKind::Tbi.file_name(database));
        let tbi_outcome = if tbi_path.exists() {
            info!("TBI already exists");
            FileOutcome::AlreadyPresent
        } else {
            self.downloader.download_file(&urls.tbi, &tbi_path).await?;
            FileOutcome::Downloaded
        };

        let md5_path = dated_dir.join(FileKind::Md5.file_name(database));
        let md5_outcome = if md5_path.exists() {
            FileOutcome::AlreadyPresent
        } else {
            fs::write(&md5_path, md5_text)?;
            FileOutcome::Downloaded
        };

        let header = self.validator.inspect(&vcf_path)?;
        let reference_mismatch = !reference_matches(header.reference.as_deref(), genome_version);
        if reference_mismatch {
            warn!(
                "{} declares reference {:?} but was catalogued as {}",
                vcf_path.display(),
                header.reference,
                genome_version
            );
        }

        self.record_manifest(
            database,
            genome_version,
            &expected.date,
            &expected.hash,
            &vcf_path,
            vcf_outcome,
            &header,
        )?;

        let mut files = Vec::with_capacity(FileKind::ALL.len());
        for (kind, path, outcome) in [
            (FileKind::Vcf, vcf_path, vcf_outcome),
            (FileKind::Tbi, tbi_path, tbi_outcome),
            (FileKind::Md5, md5_path, md5_outcome),
        ] {
            let linked = self
                .store
                .update_symlink(database, genome_version, &expected.date, kind)?;
            files.push(FileReport {
                kind,
                path,
                outcome,
                linked,
            });
        }

        info!(
            "Download complete: {}/{} release {}",
            database, genome_version, expected.date
        );

        Ok(DownloadReport {
            database: database.to_string(),
            genome_version: genome_version.to_string(),
            date: expected.date,
            location: self.store.version_dir(database, genome_version),
            files,
            header,
            reference_mismatch,
        })
    }

    /// Download every catalog entry in order, stopping at the first failure
    pub async fn download_all_databases(&self) -> Result<Vec<DownloadReport>> {
        let mut reports = Vec::new();
        for (database, genome_version, _) in self.catalog.entries() {
            reports.push(self.download_database(database, genome_version).await?);
        }
        Ok(reports)
    }

    pub fn list_databases(&self) -> Result<Vec<DatabaseStatus>> {
        let mut statuses = Vec::new();

        for (database, genome_version, files) in self.catalog.entries() {
            let current_date = self.store.current_date(database, genome_version)?;
            let manifest = match &current_date {
                Some(date) => self.store.read_manifest(database, genome_version, date)?,
                None => None,
            };

            statuses.push(DatabaseStatus {
                database: database.to_string(),
                genome_version: genome_version.to_string(),
                files: files.clone(),
                location: self.store.version_dir(database, genome_version),
                installed_dates: self.store.installed_dates(database, genome_version)?,
                current_date,
                manifest,
            });
        }

        Ok(statuses)
    }

    /// Re-hash the current release against its stored MD5 sidecar
    pub fn verify_database(&self, database: &str, genome_version: &str) -> Result<VerifyReport> {
        self.catalog.lookup(database, genome_version)?;

        let date = self
            .store
            .current_date(database, genome_version)?
            .ok_or_else(|| GladeError::NotInstalled {
                database: database.to_string(),
                genome_version: genome_version.to_string(),
            })?;

        let vcf_path = self.store.current_link(database, genome_version, FileKind::Vcf);
        let md5_path = self.store.current_link(database, genome_version, FileKind::Md5);

        let expected = parse_md5_file(&fs::read_to_string(&md5_path)?)?.hash;
        let actual = calculate_md5(&vcf_path)?;
        let valid = actual == expected;

        if valid {
            info!("{}/{} release {} verified", database, genome_version, date);
        } else {
            warn!(
                "{}/{} release {} failed verification: expected {}, got {}",
                database, genome_version, date, expected, actual
            );
        }

        Ok(VerifyReport {
            database: database.to_string(),
            genome_version: genome_version.to_string(),
            date,
            path: vcf_path,
            expected,
            actual,
            valid,
        })
    }

    pub fn prune_database(
        &self,
        database: &str,
        genome_version: &str,
        keep: usize,
    ) -> Result<Vec<String>> {
        self.catalog.lookup(database, genome_version)?;
        self.store.prune(database, genome_version, keep)
    }

    async fn ensure_vcf(&self, url: &str, path: &Path, expected_md5: &str) -> Result<FileOutcome> {
        if !path.exists() {
            self.download_verified(url, path, expected_md5).await?;
            return Ok(FileOutcome::Downloaded);
        }

        info!("VCF already exists, verifying MD5 checksum");
        match verify_md5(path, expected_md5) {
            Ok(true) => {
                info!("Checksum valid");
                Ok(FileOutcome::AlreadyPresent)
            }
            Ok(false) => {
                warn!(
                    "Invalid checksum for {} (expected {}), downloading again",
                    path.display(),
                    expected_md5
                );
                fs::remove_file(path)?;
                self.download_verified(url, path, expected_md5).await?;
                Ok(FileOutcome::Redownloaded)
            }
            Err(e) => {
                warn!("Could not verify {}: {}", path.display(), e);
                Ok(FileOutcome::AlreadyPresent)
            }
        }
    }

    async fn download_verified(&self, url: &str, path: &Path, expected_md5: &str) -> Result<()> {
        self.downloader.download_file(url, path).await?;

        let actual = calculate_md5(path)?;
        if !actual.eq_ignore_ascii_case(expected_md5) {
            fs::remove_file(path)?;
            return Err(GladeError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected_md5.to_string(),
                actual,
            });
        }

        info!("Checksum valid for {}", path.display());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn record_manifest(
        &self,
        database: &str,
        genome_version: &str,
        date: &str,
        md5: &str,
        vcf_path: &Path,
        vcf_outcome: FileOutcome,
        header: &VcfHeader,
    ) -> Result<()> {
        if vcf_outcome == FileOutcome::AlreadyPresent {
            if let Some(existing) = self.store.read_manifest(database, genome_version, date)? {
                if existing.md5 == md5 {
                    return Ok(());
                }
            }
        }

        let manifest = InstallManifest {
            database: database.to_string(),
            genome_version: genome_version.to_string(),
            date: date.to_string(),
            md5: md5.to_string(),
            sha256: calculate_sha256(vcf_path)?,
            downloaded_at: Utc::now(),
            file_format: Some(header.file_format.clone()),
            reference: header.reference.clone(),
        };
        self.store.write_manifest(&manifest)?;
        Ok(())
    }
}
