// ==============================================================================
// config.rs - Database Catalog and Runtime Settings
// ==============================================================================
// Description: Loads the database catalog (embedded or user YAML) and resolves
//              the on-disk location and network settings
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Catalog format:
//   clinvar:
//     GRCh38:
//       vcf: https://.../clinvar.vcf.gz
//       tbi: https://.../clinvar.vcf.gz.tbi
//       md5: https://.../clinvar.vcf.gz.md5
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{GladeError, Result};

const DATABASES_YAML: &str = include_str!("databases.yaml");

/// Environment variable overriding the database root directory
pub const GLADE_HOME_ENV: &str = "GLADE_HOME";

/// Download URLs for one database release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseFiles {
    /// Bgzipped VCF
    pub vcf: String,
    /// Tabix index
    pub tbi: String,
    /// MD5 sidecar for the VCF
    pub md5: String,
}

impl DatabaseFiles {
    fn urls(&self) -> [(&'static str, &str); 3] {
        [
            ("vcf", self.vcf.as_str()),
            ("tbi", self.tbi.as_str()),
            ("md5", self.md5.as_str()),
        ]
    }
}

/// Catalog of databases keyed by name, then by genome version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseCatalog {
    databases: BTreeMap<String, BTreeMap<String, DatabaseFiles>>,
}

impl DatabaseCatalog {
    /// Catalog bundled with the binary
    pub fn embedded() -> Result<Self> {
        Self::from_yaml_str(DATABASES_YAML)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let catalog: DatabaseCatalog = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!("Loading catalog from {}", path.display());
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// User catalog when given, embedded catalog otherwise
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.databases.is_empty() {
            return Err(GladeError::InvalidCatalog(
                "catalog defines no databases".to_string(),
            ));
        }

        for (name, versions) in &self.databases {
            if versions.is_empty() {
                return Err(GladeError::InvalidCatalog(format!(
                    "database '{}' has no genome versions",
                    name
                )));
            }

            for (version, files) in versions {
                for (kind, url) in files.urls() {
                    if !(url.starts_with("https://") || url.starts_with("http://")) {
                        return Err(GladeError::InvalidCatalog(format!(
                            "{}/{}: {} URL '{}' must use http or https",
                            name, version, kind, url
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn lookup(&self, database: &str, genome_version: &str) -> Result<&DatabaseFiles> {
        let versions = self
            .databases
            .get(database)
            .ok_or_else(|| GladeError::UnknownDatabase(database.to_string()))?;

        versions
            .get(genome_version)
            .ok_or_else(|| GladeError::UnknownGenomeVersion {
                database: database.to_string(),
                genome_version: genome_version.to_string(),
            })
    }

    /// All `(database, genome_version, files)` triples in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &DatabaseFiles)> {
        self.databases.iter().flat_map(|(name, versions)| {
            versions
                .iter()
                .map(move |(version, files)| (name.as_str(), version.as_str(), files))
        })
    }

    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}

/// Runtime settings shared by the CLI and the C interface
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory holding all installed databases
    pub base_dir: PathBuf,
    /// Optional user catalog replacing the embedded one
    pub catalog_path: Option<PathBuf>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts per request (1 = no retry)
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Settings {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

    /// Settings rooted at `base_dir` with default network behaviour
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            catalog_path: None,
            timeout: Self::DEFAULT_TIMEOUT,
            retries: Self::DEFAULT_RETRIES,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
        }
    }

    /// Settings rooted at the resolved default location
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_base_dir(resolve_base_dir(None)?))
    }

    pub fn load_catalog(&self) -> Result<DatabaseCatalog> {
        DatabaseCatalog::load(self.catalog_path.as_deref())
    }
}

/// Resolve the database root: explicit path, then `$GLADE_HOME`, then
/// `~/.glade/databases`
pub fn resolve_base_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    if let Some(dir) = std::env::var_os(GLADE_HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let home = dirs::home_dir().ok_or(GladeError::HomeDirUnavailable)?;
    Ok(home.join(".glade").join("databases"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_CATALOG: &str = r#"
dbsnp:
  GRCh38:
    vcf: https://example.org/dbsnp.vcf.gz
    tbi: https://example.org/dbsnp.vcf.gz.tbi
    md5: https://example.org/dbsnp.vcf.gz.md5
clinvar:
  GRCh38:
    vcf: https://example.org/38/clinvar.vcf.gz
    tbi: https://example.org/38/clinvar.vcf.gz.tbi
    md5: https://example.org/38/clinvar.vcf.gz.md5
  GRCh37:
    vcf: https://example.org/37/clinvar.vcf.gz
    tbi: https://example.org/37/clinvar.vcf.gz.tbi
    md5: https://example.org/37/clinvar.vcf.gz.md5
"#;

    #[test]
    fn test_embedded_catalog_has_clinvar_builds() {
        let catalog = DatabaseCatalog::embedded().unwrap();

        let grch37 = catalog.lookup("clinvar", "GRCh37").unwrap();
        assert!(grch37.vcf.ends_with("vcf_GRCh37/clinvar.vcf.gz"));

        let grch38 = catalog.lookup("clinvar", "GRCh38").unwrap();
        assert!(grch38.md5.ends_with("vcf_GRCh38/clinvar.vcf.gz.md5"));
    }

    #[test]
    fn test_entries_are_sorted() {
        let catalog = DatabaseCatalog::from_yaml_str(TEST_CATALOG).unwrap();

        let entries: Vec<(&str, &str)> = catalog.entries().map(|(d, v, _)| (d, v)).collect();
        assert_eq!(
            entries,
            vec![("clinvar", "GRCh37"), ("clinvar", "GRCh38"), ("dbsnp", "GRCh38")]
        );
    }

    #[test]
    fn test_lookup_errors() {
        let catalog = DatabaseCatalog::from_yaml_str(TEST_CATALOG).unwrap();

        assert!(matches!(
            catalog.lookup("gnomad", "GRCh38"),
            Err(GladeError::UnknownDatabase(name)) if name == "gnomad"
        ));
        assert!(matches!(
            catalog.lookup("dbsnp", "GRCh37"),
            Err(GladeError::UnknownGenomeVersion { .. })
        ));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let yaml = r#"
clinvar:
  GRCh38:
    vcf: ftp://ftp.ncbi.nlm.nih.gov/clinvar.vcf.gz
    tbi: https://example.org/clinvar.vcf.gz.tbi
    md5: https://example.org/clinvar.vcf.gz.md5
"#;
        assert!(matches!(
            DatabaseCatalog::from_yaml_str(yaml),
            Err(GladeError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_rejects_empty_catalog_and_missing_fields() {
        assert!(matches!(
            DatabaseCatalog::from_yaml_str("{}"),
            Err(GladeError::InvalidCatalog(_))
        ));
        assert!(matches!(
            DatabaseCatalog::from_yaml_str("clinvar: {}"),
            Err(GladeError::InvalidCatalog(_))
        ));

        let missing_md5 = "clinvar:\n  GRCh38:\n    vcf: https://a/b\n    tbi: https://a/c\n";
        assert!(matches!(
            DatabaseCatalog::from_yaml_str(missing_md5),
            Err(GladeError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TEST_CATALOG.as_bytes()).unwrap();
        file.flush().unwrap();

        let catalog = DatabaseCatalog::load(Some(file.path())).unwrap();
        assert_eq!(
            catalog.database_names().collect::<Vec<_>>(),
            vec!["clinvar", "dbsnp"]
        );
    }

    #[test]
    fn test_explicit_base_dir_wins() {
        let dir = resolve_base_dir(Some(PathBuf::from("/srv/glade"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/glade"));
    }
}
