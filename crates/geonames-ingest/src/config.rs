//! Ingestion configuration
//!
//! An [`IngestConfig`] is built once per run, validated, and then handed by
//! reference to the catalog, the fetcher and the seeders. Nothing mutates it
//! afterwards.

use crate::error::{IngestError, Result};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// Placeholder substituted by each requested dataset name
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Placeholder substituted by [`IngestConfig::base_url`] inside the name template
pub const BASE_URL_PLACEHOLDER: &str = "{base_url}";

pub const DEFAULT_WORKING_DIR: &str = "./storage/geonames";

pub const DEFAULT_BASE_URL: &str = "https://download.geonames.org/export/dump";

pub const DEFAULT_NAME_TEMPLATE: &str = "{base_url}/{name}.zip";

/// The "cities above population 15000" dump
pub const DEFAULT_NAME: &str = "cities15000";

pub const DEFAULT_ALTERNATE_NAMES_FILE: &str = "alternateNames.zip";

pub const DEFAULT_FILES: &[&str] = &[
    "countryInfo.txt",
    "admin1CodesASCII.txt",
    "admin2Codes.txt",
    "hierarchy.zip",
    "featureCodes_en.txt",
    "timeZones.txt",
    "iso-languagecodes.txt",
];

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Longest line the record parser accepts, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 32 * 1024;

pub const PRODUCTION_ENVIRONMENT: &str = "production";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Download and extraction cache, also the seeders' input directory
    pub working_dir: PathBuf,

    /// Base URL the static file list is relative to
    pub base_url: String,

    /// Remote location of one named dataset, e.g. `{base_url}/{name}.zip`
    pub name_template: String,

    /// Static dataset files fetched on every run, relative to `base_url`
    pub files: Vec<String>,

    pub alternate_names_file: String,

    /// Name used when an import requests none
    pub default_name: String,

    pub compressed_suffix: String,
    pub plain_suffix: String,

    /// HTTP timeout; `None` waits indefinitely
    pub timeout_secs: Option<u64>,

    /// Rows per INSERT statement
    pub batch_size: usize,

    pub max_line_length: usize,

    /// Deployment environment; `production` requires `seed --force`
    pub environment: String,

    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            base_url: DEFAULT_BASE_URL.to_string(),
            name_template: DEFAULT_NAME_TEMPLATE.to_string(),
            files: DEFAULT_FILES.iter().map(|f| f.to_string()).collect(),
            alternate_names_file: DEFAULT_ALTERNATE_NAMES_FILE.to_string(),
            default_name: DEFAULT_NAME.to_string(),
            compressed_suffix: ".zip".to_string(),
            plain_suffix: ".txt".to_string(),
            timeout_secs: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            environment: "local".to_string(),
            show_progress: true,
        }
    }
}

impl IngestConfig {
    /// Load configuration from the environment (and `.env`) over the defaults
    ///
    /// Environment variables:
    /// - `GEONAMES_PATH`: working directory
    /// - `GEONAMES_BASE_URL`: base URL for the static files
    /// - `GEONAMES_NAME_TEMPLATE`: template for named datasets
    /// - `GEONAMES_FILES`: comma-separated static file list
    /// - `GEONAMES_ALTERNATE_NAMES_FILE`: alternate names archive
    /// - `GEONAMES_DEFAULT_NAME`: name used when none is requested
    /// - `GEONAMES_HTTP_TIMEOUT`: HTTP timeout in seconds
    /// - `GEONAMES_BATCH_SIZE`: rows per insert batch
    /// - `GEONAMES_MAX_LINE_LENGTH`: longest accepted line in bytes
    /// - `GEONAMES_ENV`: deployment environment
    /// - `GEONAMES_PROGRESS`: show download progress bars (true/false)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(path) = std::env::var("GEONAMES_PATH") {
            config.working_dir = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("GEONAMES_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(template) = std::env::var("GEONAMES_NAME_TEMPLATE") {
            config.name_template = template;
        }

        if let Ok(files) = std::env::var("GEONAMES_FILES") {
            config.files = files
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }

        if let Ok(file) = std::env::var("GEONAMES_ALTERNATE_NAMES_FILE") {
            config.alternate_names_file = file;
        }

        if let Ok(name) = std::env::var("GEONAMES_DEFAULT_NAME") {
            config.default_name = name;
        }

        if let Ok(timeout) = std::env::var("GEONAMES_HTTP_TIMEOUT") {
            config.timeout_secs = Some(parse_env("GEONAMES_HTTP_TIMEOUT", &timeout)?);
        }

        if let Ok(size) = std::env::var("GEONAMES_BATCH_SIZE") {
            config.batch_size = parse_env("GEONAMES_BATCH_SIZE", &size)?;
        }

        if let Ok(max) = std::env::var("GEONAMES_MAX_LINE_LENGTH") {
            config.max_line_length = parse_env("GEONAMES_MAX_LINE_LENGTH", &max)?;
        }

        if let Ok(env) = std::env::var("GEONAMES_ENV") {
            config.environment = env;
        }

        if let Ok(progress) = std::env::var("GEONAMES_PROGRESS") {
            config.show_progress = parse_env("GEONAMES_PROGRESS", &progress)?;
        }

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.working_dir.as_os_str().is_empty() {
            return Err(IngestError::config("working directory cannot be empty"));
        }

        if self.name_template.matches(NAME_PLACEHOLDER).count() != 1 {
            return Err(IngestError::config(format!(
                "name template '{}' must contain {} exactly once",
                self.name_template, NAME_PLACEHOLDER
            )));
        }

        if self.batch_size == 0 {
            return Err(IngestError::config("batch size must be greater than 0"));
        }

        if self.max_line_length == 0 {
            return Err(IngestError::config("max line length must be greater than 0"));
        }

        if self.compressed_suffix.is_empty() || self.plain_suffix.is_empty() {
            return Err(IngestError::config("file suffixes cannot be empty"));
        }

        Ok(())
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Remote URL of a static file
    pub fn file_url(&self, file: &str) -> String {
        format!("{}/{}", self.base_url, file.trim_start_matches('/'))
    }

    pub fn requires_force(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION_ENVIRONMENT)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IngestError::config(format!("invalid value '{value}' for {key}")))
}
