// ==============================================================================
// main.rs - Glade Command Line Entry Point
// ==============================================================================
// Description: CLI for downloading, listing, verifying and pruning
//              annotation databases
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================
// Usage:
//   glade database list
//   glade database download --database clinvar --genome-version GRCh38
//   glade database download --all
//   glade database verify --database clinvar --genome-version GRCh38
//   glade database prune --database clinvar --genome-version GRCh38 --keep 2
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glade::config::{resolve_base_dir, Settings, GLADE_HOME_ENV};
use glade::{DatabaseManager, DatabaseStatus, DownloadReport, FileOutcome, VerifyReport};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory for installed databases
    #[arg(long, env = GLADE_HOME_ENV, global = true)]
    base_dir: Option<PathBuf>,

    /// YAML catalog replacing the built-in database list
    #[arg(long, env = "GLADE_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = Settings::DEFAULT_TIMEOUT.as_secs(), global = true)]
    timeout_secs: u64,

    /// Attempts per request for transient failures
    #[arg(long, default_value_t = Settings::DEFAULT_RETRIES, global = true)]
    retries: u32,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage annotation databases
    Database {
        #[command(subcommand)]
        action: DatabaseAction,
    },
}

#[derive(Subcommand, Debug)]
enum DatabaseAction {
    /// Download one database build, or every catalog entry
    Download {
        #[arg(long, conflicts_with = "all")]
        database: Option<String>,

        #[arg(long, conflicts_with = "all")]
        genome_version: Option<String>,

        #[arg(long)]
        all: bool,
    },

    /// Show catalog entries and install status
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-check the installed release against its MD5 sidecar
    Verify {
        #[arg(long)]
        database: String,

        #[arg(long)]
        genome_version: String,
    },

    /// Remove old releases
    Prune {
        #[arg(long)]
        database: String,

        #[arg(long)]
        genome_version: String,

        /// Newest releases to keep
        #[arg(long, default_value_t = 1)]
        keep: usize,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "glade=debug" } else { "glade=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Database {
        action:
            DatabaseAction::Download {
                database,
                genome_version,
                all: false,
            },
    } = &cli.command
    {
        if database.is_none() || genome_version.is_none() {
            eprintln!("Error: Must specify either --all or both --database and --genome-version");
            std::process::exit(1);
        }
    }

    let settings = Settings {
        base_dir: resolve_base_dir(cli.base_dir)?,
        catalog_path: cli.catalog,
        timeout: Duration::from_secs(cli.timeout_secs),
        retries: cli.retries,
        retry_delay: Settings::DEFAULT_RETRY_DELAY,
    };
    info!("Database root: {}", settings.base_dir.display());

    let manager =
        DatabaseManager::new(&settings).context("Failed to initialise database manager")?;

    match cli.command {
        Commands::Database { action } => match action {
            DatabaseAction::Download {
                database,
                genome_version,
                all,
            } => {
                if all {
                    for report in manager.download_all_databases().await? {
                        print_download(&report);
                    }
                } else if let (Some(database), Some(genome_version)) = (database, genome_version) {
                    let report = manager
                        .download_database(&database, &genome_version)
                        .await
                        .with_context(|| {
                            format!("Failed to download {}/{}", database, genome_version)
                        })?;
                    print_download(&report);
                }
            }
            DatabaseAction::List { json } => {
                let statuses = manager.list_databases()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&statuses)?);
                } else {
                    print_list(&statuses);
                }
            }
            DatabaseAction::Verify {
                database,
                genome_version,
            } => {
                let report = manager.verify_database(&database, &genome_version)?;
                print_verify(&report);
                if !report.valid {
                    std::process::exit(1);
                }
            }
            DatabaseAction::Prune {
                database,
                genome_version,
                keep,
            } => {
                let removed = manager.prune_database(&database, &genome_version, keep)?;
                if removed.is_empty() {
                    println!("Nothing to prune for {}/{}", database, genome_version);
                } else {
                    println!(
                        "Removed {} release(s) of {}/{}:",
                        removed.len(),
                        database,
                        genome_version
                    );
                    for date in removed {
                        println!("  {}", date);
                    }
                }
            }
        },
    }

    Ok(())
}

fn rule() -> String {
    "=".repeat(60)
}

fn print_download(report: &DownloadReport) {
    println!("{}", rule());
    println!("Download complete!");
    println!("  Database: {}/{}", report.database, report.genome_version);
    println!("  Location: {}", report.location.display());
    println!("  Date: {}", report.date);
    for file in &report.files {
        let outcome = match file.outcome {
            FileOutcome::AlreadyPresent => "already present",
            FileOutcome::Downloaded => "downloaded",
            FileOutcome::Redownloaded => "re-downloaded (checksum mismatch)",
        };
        let link = if file.linked { "" } else { " [symlink not updated]" };
        println!("    {}: {}{}", file.kind.label(), outcome, link);
    }
    if report.reference_mismatch {
        println!(
            "  Warning: VCF header reference {:?} does not match {}",
            report.header.reference, report.genome_version
        );
    }
    println!("{}", rule());
}

fn print_list(statuses: &[DatabaseStatus]) {
    println!("Available databases:");
    println!("{}", rule());

    let mut last_database = None;
    for status in statuses {
        if last_database != Some(status.database.as_str()) {
            println!("\nDatabase: {}", status.database);
            last_database = Some(status.database.as_str());
        }
        println!("  Genome Version: {}", status.genome_version);
        println!("    VCF: {}", status.files.vcf);
        println!("    TBI: {}", status.files.tbi);
        println!("    MD5: {}", status.files.md5);

        match &status.current_date {
            Some(date) => println!(
                "    Status: Downloaded to {} (current {}, {} release(s))",
                status.location.display(),
                date,
                status.installed_dates.len()
            ),
            None if status.is_installed() => println!(
                "    Status: Partially downloaded to {}",
                status.location.display()
            ),
            None => println!("    Status: Not downloaded"),
        }
    }

    println!("\n{}", rule());
    println!(
        "Use 'glade database download --database <NAME> --genome-version <VERSION>' to download"
    );
    println!("Use 'glade database download --all' to download all databases");
}

fn print_verify(report: &VerifyReport) {
    let verdict = if report.valid { "Valid" } else { "INVALID" };
    println!(
        "{}/{} release {}: {}",
        report.database, report.genome_version, report.date, verdict
    );
    println!("  File: {}", report.path.display());
    println!("  Expected: {}", report.expected);
    println!("  Actual:   {}", report.actual);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_all_conflicts_with_database() {
        let result = Cli::try_parse_from([
            "glade", "database", "download", "--all", "--database", "clinvar",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_prune_default_keep() {
        let cli = Cli::try_parse_from([
            "glade",
            "database",
            "prune",
            "--database",
            "clinvar",
            "--genome-version",
            "GRCh38",
        ])
        .unwrap();

        match cli.command {
            Commands::Database {
                action: DatabaseAction::Prune { keep, .. },
            } => assert_eq!(keep, 1),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
