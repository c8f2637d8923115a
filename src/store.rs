// ==============================================================================
// store.rs - On-Disk Database Layout
// ==============================================================================
// Description: Dated release directories, "current" symlinks, install
//              manifests and pruning of old releases
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Layout:
//   <base>/<db>/<version>/<YYYYMMDD>/<db>.vcf.gz
//   <base>/<db>/<version>/<YYYYMMDD>/<db>.vcf.gz.tbi
//   <base>/<db>/<version>/<YYYYMMDD>/<db>.vcf.gz.md5
//   <base>/<db>/<version>/<YYYYMMDD>/manifest.json
//   <base>/<db>/<version>/<db>.vcf.gz -> <YYYYMMDD>/<db>.vcf.gz   (and .tbi, .md5)
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{GladeError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One of the three files making up a database release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Vcf,
    Tbi,
    Md5,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Vcf, FileKind::Tbi, FileKind::Md5];

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Vcf => "VCF",
            FileKind::Tbi => "TBI",
            FileKind::Md5 => "MD5",
        }
    }

    /// Local file name for this part of `database`
    pub fn file_name(&self, database: &str) -> String {
        match self {
            FileKind::Vcf => format!("{}.vcf.gz", database),
            FileKind::Tbi => format!("{}.vcf.gz.tbi", database),
            FileKind::Md5 => format!("{}.vcf.gz.md5", database),
        }
    }
}

/// Record written next to each installed release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub database: String,
    pub genome_version: String,
    /// Release date (YYYYMMDD)
    pub date: String,
    pub md5: String,
    pub sha256: String,
    pub downloaded_at: DateTime<Utc>,
    pub file_format: Option<String>,
    pub reference: Option<String>,
}

pub struct DatabaseStore {
    base_dir: PathBuf,
}

impl DatabaseStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the releases and current symlinks of one build
    pub fn version_dir(&self, database: &str, genome_version: &str) -> PathBuf {
        self.base_dir.join(database).join(genome_version)
    }

    pub fn dated_dir(&self, database: &str, genome_version: &str, date: &str) -> PathBuf {
        self.version_dir(database, genome_version).join(date)
    }

    /// Path of the stable symlink for `kind`
    pub fn current_link(&self, database: &str, genome_version: &str, kind: FileKind) -> PathBuf {
        self.version_dir(database, genome_version)
            .join(kind.file_name(database))
    }

    /// Installed release dates, oldest first
    ///
    /// Only directories holding a manifest count; one is written as the last
    /// step of a successful download.
    pub fn installed_dates(&self, database: &str, genome_version: &str) -> Result<Vec<String>> {
        let dir = self.version_dir(database, genome_version);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.path().join(MANIFEST_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_release_date(name) {
                    dates.push(name.to_string());
                }
            }
        }

        dates.sort();
        Ok(dates)
    }

    /// Release the VCF symlink currently points at
    pub fn current_date(&self, database: &str, genome_version: &str) -> Result<Option<String>> {
        let link = self.current_link(database, genome_version, FileKind::Vcf);

        let target = match fs::read_link(&link) {
            Ok(target) => target,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidInput) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(target
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .filter(|name| is_release_date(name))
            .map(str::to_string))
    }

    /// Point the current symlink for `kind` at the release from `date`
    ///
    /// Returns `false` when a regular file occupies the link path; it is
    /// left untouched.
    pub fn update_symlink(
        &self,
        database: &str,
        genome_version: &str,
        date: &str,
        kind: FileKind,
    ) -> Result<bool> {
        let link = self.current_link(database, genome_version, kind);
        let target = Path::new(date).join(kind.file_name(database));

        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(&link)?,
            Ok(_) => {
                warn!("Not replacing {}: it is not a symlink", link.display());
                return Ok(false);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        create_symlink(&target, &link)?;
        debug!("Linked {} -> {}", link.display(), target.display());
        Ok(true)
    }

    pub fn write_manifest(&self, manifest: &InstallManifest) -> Result<PathBuf> {
        let path = self
            .dated_dir(&manifest.database, &manifest.genome_version, &manifest.date)
            .join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
        Ok(path)
    }

    pub fn read_manifest(
        &self,
        database: &str,
        genome_version: &str,
        date: &str,
    ) -> Result<Option<InstallManifest>> {
        let path = self
            .dated_dir(database, genome_version, date)
            .join(MANIFEST_FILE);

        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete all but the newest `keep` releases; the current release is
    /// always kept. Returns the removed dates.
    pub fn prune(&self, database: &str, genome_version: &str, keep: usize) -> Result<Vec<String>> {
        if keep == 0 {
            return Err(GladeError::InvalidArgument(
                "must keep at least one release".to_string(),
            ));
        }

        let dates = self.installed_dates(database, genome_version)?;
        let current = self.current_date(database, genome_version)?;
        let cutoff = dates.len().saturating_sub(keep);

        let mut removed = Vec::new();
        for date in &dates[..cutoff] {
            if current.as_deref() == Some(date.as_str()) {
                continue;
            }

            let dir = self.dated_dir(database, genome_version, date);
            fs::remove_dir_all(&dir)?;
            info!("Removed release {}", dir.display());
            removed.push(date.clone());
        }

        Ok(removed)
    }
}

/// Eight ASCII digits, the shape of a release directory name
pub fn is_release_date(name: &str) -> bool {
    name.len() == 8 && name.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, _link: &Path) -> Result<()> {
    Err(GladeError::SymlinkUnsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manifest(date: &str) -> InstallManifest {
        InstallManifest {
            database: "clinvar".to_string(),
            genome_version: "GRCh38".to_string(),
            date: date.to_string(),
            md5: "5d41402abc4b2a76b9719d911017c592".to_string(),
            sha256: "abc".to_string(),
            downloaded_at: Utc::now(),
            file_format: Some("VCFv4.1".to_string()),
            reference: Some("GRCh38".to_string()),
        }
    }

    fn write_files(store: &DatabaseStore, date: &str) {
        let dir = store.dated_dir("clinvar", "GRCh38", date);
        fs::create_dir_all(&dir).unwrap();
        for kind in FileKind::ALL {
            fs::write(dir.join(kind.file_name("clinvar")), date).unwrap();
        }
    }

    fn install_release(store: &DatabaseStore, date: &str) {
        write_files(store, date);
        store.write_manifest(&manifest(date)).unwrap();
    }

    #[test]
    fn test_file_names() {
        assert_eq!(FileKind::Vcf.file_name("clinvar"), "clinvar.vcf.gz");
        assert_eq!(FileKind::Tbi.file_name("clinvar"), "clinvar.vcf.gz.tbi");
        assert_eq!(FileKind::Md5.file_name("clinvar"), "clinvar.vcf.gz.md5");
    }

    #[test]
    fn test_is_release_date() {
        assert!(is_release_date("20240107"));
        assert!(!is_release_date("2024010"));
        assert!(!is_release_date("latest"));
        assert!(!is_release_date("2024-01-07"));
    }

    #[test]
    fn test_installed_dates_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());

        assert!(store.installed_dates("clinvar", "GRCh38").unwrap().is_empty());

        install_release(&store, "20240107");
        install_release(&store, "20231230");
        fs::create_dir_all(store.version_dir("clinvar", "GRCh38").join("tmp")).unwrap();

        assert_eq!(
            store.installed_dates("clinvar", "GRCh38").unwrap(),
            vec!["20231230", "20240107"]
        );
    }

    #[test]
    fn test_release_without_manifest_is_not_installed() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());
        install_release(&store, "20231215");
        install_release(&store, "20231230");
        write_files(&store, "20240107");
        fs::create_dir_all(store.dated_dir("clinvar", "GRCh38", "20240114")).unwrap();

        assert_eq!(
            store.installed_dates("clinvar", "GRCh38").unwrap(),
            vec!["20231215", "20231230"]
        );

        assert!(store.prune("clinvar", "GRCh38", 2).unwrap().is_empty());
        assert!(store.dated_dir("clinvar", "GRCh38", "20231215").is_dir());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());
        write_files(&store, "20240107");

        let manifest = manifest("20240107");
        store.write_manifest(&manifest).unwrap();

        let loaded = store.read_manifest("clinvar", "GRCh38", "20240107").unwrap();
        assert_eq!(loaded, Some(manifest));
        assert_eq!(store.read_manifest("clinvar", "GRCh38", "20200101").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_track_current_release() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());
        install_release(&store, "20231230");
        install_release(&store, "20240107");

        assert_eq!(store.current_date("clinvar", "GRCh38").unwrap(), None);

        for kind in FileKind::ALL {
            assert!(store.update_symlink("clinvar", "GRCh38", "20231230", kind).unwrap());
        }
        assert_eq!(
            store.current_date("clinvar", "GRCh38").unwrap().as_deref(),
            Some("20231230")
        );

        assert!(store
            .update_symlink("clinvar", "GRCh38", "20240107", FileKind::Vcf)
            .unwrap());
        assert_eq!(
            store.current_date("clinvar", "GRCh38").unwrap().as_deref(),
            Some("20240107")
        );

        let link = store.current_link("clinvar", "GRCh38", FileKind::Vcf);
        assert_eq!(fs::read_to_string(link).unwrap(), "20240107");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_replaces_dangling_but_not_regular_file() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());
        install_release(&store, "20240107");

        let vcf_link = store.current_link("clinvar", "GRCh38", FileKind::Vcf);
        std::os::unix::fs::symlink("19990101/clinvar.vcf.gz", &vcf_link).unwrap();
        assert!(store
            .update_symlink("clinvar", "GRCh38", "20240107", FileKind::Vcf)
            .unwrap());
        assert!(vcf_link.exists());

        let tbi_link = store.current_link("clinvar", "GRCh38", FileKind::Tbi);
        fs::write(&tbi_link, "user data").unwrap();
        assert!(!store
            .update_symlink("clinvar", "GRCh38", "20240107", FileKind::Tbi)
            .unwrap());
        assert_eq!(fs::read_to_string(&tbi_link).unwrap(), "user data");
    }

    #[cfg(unix)]
    #[test]
    fn test_prune_keeps_newest_and_current() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());
        for date in ["20231201", "20231215", "20231230", "20240107"] {
            install_release(&store, date);
        }
        // Current points at an older release, e.g. after a rollback
        store
            .update_symlink("clinvar", "GRCh38", "20231215", FileKind::Vcf)
            .unwrap();

        let removed = store.prune("clinvar", "GRCh38", 1).unwrap();
        assert_eq!(removed, vec!["20231201", "20231230"]);
        assert_eq!(
            store.installed_dates("clinvar", "GRCh38").unwrap(),
            vec!["20231215", "20240107"]
        );
    }

    #[test]
    fn test_prune_rejects_zero() {
        let dir = tempdir().unwrap();
        let store = DatabaseStore::new(dir.path());

        assert!(matches!(
            store.prune("clinvar", "GRCh38", 0),
            Err(GladeError::InvalidArgument(_))
        ));
    }
}
