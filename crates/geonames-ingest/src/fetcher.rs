//! Idempotent HTTP fetcher
//!
//! The working directory doubles as a cache: a file that is already there,
//! either as downloaded or in its extracted `.txt` form, is never fetched
//! again. A transfer that fails halfway leaves its partial file behind.

use crate::catalog::RemoteFile;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::models::{FileState, WorkingFile};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("geonames-ingest/", env!("CARGO_PKG_VERSION"));

pub struct Fetcher {
    client: Client,
    compressed_suffix: String,
    plain_suffix: String,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| IngestError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            compressed_suffix: config.compressed_suffix.clone(),
            plain_suffix: config.plain_suffix.clone(),
            show_progress: config.show_progress,
        })
    }

    /// The cached copy of `file_name` in `dir`, if there is one
    ///
    /// An archive counts as cached when its extracted counterpart exists.
    pub fn existing_local(&self, dir: &Path, file_name: &str) -> Option<PathBuf> {
        let path = dir.join(file_name);
        if path.exists() {
            return Some(path);
        }

        let plain = file_name
            .strip_suffix(&self.compressed_suffix)
            .map(|stem| dir.join(format!("{stem}{}", self.plain_suffix)))?;

        plain.exists().then_some(plain)
    }

    /// Make sure `remote` is present in `dir`, downloading it if needed
    pub async fn ensure_local(&self, remote: &RemoteFile, dir: &Path) -> Result<WorkingFile> {
        let mut working = WorkingFile::pending(dir.join(&remote.file_name), &remote.url);

        if let Some(existing) = self.existing_local(dir, &remote.file_name) {
            debug!(file = %existing.display(), "Already present, skipping download");
            working.local_path = existing;
            working.advance(FileState::SkippedExisting);
            return Ok(working);
        }

        info!("Downloading {} ...", remote.url);
        let bytes = self.download(&remote.url, &working.local_path).await?;
        working.advance(FileState::Downloaded);
        info!(url = %remote.url, bytes, "Downloaded {}", remote.file_name);

        Ok(working)
    }

    /// Stream `url` into `path`; redirects are followed by the client
    async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let fetch_error = |reason: String| IngestError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("server responded {}", response.status())));
        }

        let pb = self.progress_bar(response.content_length(), path);

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| fetch_error(format!("cannot open {} for writing: {e}", path.display())))?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_error(format!("transfer interrupted: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| fetch_error(format!("write to {} failed: {e}", path.display())))?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush()
            .await
            .map_err(|e| fetch_error(format!("write to {} failed: {e}", path.display())))?;

        pb.finish_and_clear();

        Ok(downloaded)
    }

    fn progress_bar(&self, total: Option<u64>, path: &Path) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total.unwrap_or(0));
        let style = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(format!("Downloading {name}"));
        pb
    }
}
