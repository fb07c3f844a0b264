//! Single-file archive extraction
//!
//! Geonames archives hold one member named like the archive with `.txt` in
//! place of `.zip` (`AD.zip` -> `AD.txt`). Extraction writes the members next
//! to the archive and removes the archive on success.

use crate::error::{IngestError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    compressed_suffix: String,
    plain_suffix: String,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new(".zip", ".txt")
    }
}

impl ArchiveExtractor {
    pub fn new(compressed_suffix: impl Into<String>, plain_suffix: impl Into<String>) -> Self {
        Self {
            compressed_suffix: compressed_suffix.into(),
            plain_suffix: plain_suffix.into(),
        }
    }

    pub fn is_archive(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.compressed_suffix))
    }

    /// Path of the member an archive extracts to
    ///
    /// Paths that do not carry the compressed suffix are returned unchanged.
    pub fn plain_path(&self, path: &Path) -> PathBuf {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return path.to_path_buf();
        };

        match name.strip_suffix(&self.compressed_suffix) {
            Some(stem) => path.with_file_name(format!("{stem}{}", self.plain_suffix)),
            None => path.to_path_buf(),
        }
    }

    /// Extract `archive` into its own directory, delete it, and return the
    /// plain-text path
    pub fn extract(&self, archive: &Path) -> Result<PathBuf> {
        let extract_error = |reason: String| IngestError::Extract {
            path: archive.to_path_buf(),
            reason,
        };

        let target_dir = archive
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let file = File::open(archive).map_err(|e| extract_error(e.to_string()))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| extract_error(format!("Failed to read zip archive: {e}")))?;

        debug!(
            "Extracting {} member(s) from {} into {}",
            zip.len(),
            archive.display(),
            target_dir.display()
        );

        zip.extract(target_dir)
            .map_err(|e| extract_error(format!("Failed to extract members: {e}")))?;
        drop(zip);

        std::fs::remove_file(archive)
            .map_err(|e| extract_error(format!("Failed to remove archive: {e}")))?;

        let plain = self.plain_path(archive);
        info!(archive = %archive.display(), file = %plain.display(), "Archive extracted");

        Ok(plain)
    }

    /// [`extract`](Self::extract) on the blocking thread pool
    pub async fn extract_async(&self, archive: PathBuf) -> Result<PathBuf> {
        let extractor = self.clone();
        let path = archive.clone();

        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|e| IngestError::Extract {
                path: archive,
                reason: format!("extraction task panicked: {e}"),
            })?
    }
}
