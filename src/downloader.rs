// ==============================================================================
// downloader.rs - HTTP Downloads with Progress and Retry
// ==============================================================================
// Description: Streams database files to disk through a partial file, with a
//              progress bar and bounded retries for transient failures
// Author: Matt Barham
// Created: 2026-10-15
// Modified: 2026-10-15
// Version: 0.1.0
// ==============================================================================

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{GladeError, Result};

const PROGRESS_TEMPLATE: &str =
    "    [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";

pub struct Downloader {
    client: reqwest::Client,
    attempts: u32,
    retry_delay: Duration,
    show_progress: bool,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("glade/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            attempts: 1,
            retry_delay: Duration::ZERO,
            show_progress: true,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.timeout)?.with_retries(settings.retries, settings.retry_delay))
    }

    /// Total attempts per request; zero is treated as one
    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Download `url` to `target`, returning the number of bytes written
    ///
    /// Data is streamed into `<target>.part` and renamed onto `target` only
    /// once the body has been fully written.
    pub async fn download_file(&self, url: &str, target: &Path) -> Result<u64> {
        self.retrying(url, || self.download_once(url, target)).await
    }

    pub async fn download_text(&self, url: &str) -> Result<String> {
        self.retrying(url, || async move {
            let response = self.get(url).await?;
            Ok(response.text().await?)
        })
        .await
    }

    async fn retrying<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts && e.is_transient() => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt, self.attempts, url, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GladeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn download_once(&self, url: &str, target: &Path) -> Result<u64> {
        let response = self.get(url).await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(target);
        let progress = self.progress_bar(response.content_length());

        let written = match stream_to_file(response, &partial, progress.as_ref()).await {
            Ok(written) => written,
            Err(e) => {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        tokio::fs::rename(&partial, target).await?;
        info!("Downloaded {} bytes to {}", written, target.display());

        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        match total {
            Some(total) if total > 0 => {
                let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-");
                Some(ProgressBar::new(total).with_style(style))
            }
            _ => {
                info!("Downloading (size unknown)...");
                None
            }
        }
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<u64> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;

        written += chunk.len() as u64;
        if let Some(pb) = progress {
            pb.set_position(written);
        }
    }

    file.flush().await?;
    Ok(written)
}

/// `<path>.part`, the in-flight name of a download
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/db/clinvar/GRCh38/20240107/clinvar.vcf.gz")),
            PathBuf::from("/db/clinvar/GRCh38/20240107/clinvar.vcf.gz.part")
        );
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let downloader = Downloader::new(Duration::from_secs(5))
            .unwrap()
            .with_retries(0, Duration::ZERO);
        assert_eq!(downloader.attempts, 1);
    }
}
