//! Dataset name resolution
//!
//! Pure functions over [`IngestConfig`]: no network access, no filesystem.

use crate::config::{IngestConfig, BASE_URL_PLACEHOLDER, NAME_PLACEHOLDER};

/// A file to fetch: where it lives and what it is called locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub file_name: String,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let file_name = file_name_of(&url);
        Self { url, file_name }
    }
}

fn file_name_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

pub struct DatasetCatalog<'a> {
    config: &'a IngestConfig,
}

impl<'a> DatasetCatalog<'a> {
    pub fn new(config: &'a IngestConfig) -> Self {
        Self { config }
    }

    /// The names a run works on; the configured default when none are given
    pub fn requested_names(&self, names: &[String]) -> Vec<String> {
        if names.is_empty() {
            vec![self.config.default_name.clone()]
        } else {
            names.to_vec()
        }
    }

    /// One remote reference per requested name, in request order
    pub fn resolve(&self, names: &[String]) -> Vec<RemoteFile> {
        self.requested_names(names)
            .iter()
            .map(|name| RemoteFile::new(self.url_for(name)))
            .collect()
    }

    /// Remote location of a single named dataset
    pub fn url_for(&self, name: &str) -> String {
        self.config
            .name_template
            .replace(BASE_URL_PLACEHOLDER, &self.config.base_url)
            .replace(NAME_PLACEHOLDER, name)
    }

    /// The static files every run fetches
    pub fn base_files(&self, alternate_names: bool) -> Vec<RemoteFile> {
        let mut files: Vec<RemoteFile> = self
            .config
            .files
            .iter()
            .map(|f| RemoteFile::new(self.config.file_url(f)))
            .collect();

        if alternate_names {
            files.push(RemoteFile::new(
                self.config.file_url(&self.config.alternate_names_file),
            ));
        }

        files
    }

    /// Everything a run fetches: static files first, then the named datasets
    pub fn fetch_list(&self, names: &[String], alternate_names: bool) -> Vec<RemoteFile> {
        let mut files = self.base_files(alternate_names);
        files.extend(self.resolve(names));
        files
    }
}
