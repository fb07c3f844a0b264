//! Import pipeline
//!
//! ```text
//! Resolve -> Fetch(*) -> [stop if fetch-only] -> Load(Continents) -> Load(Countries)
//!   -> Load(AdminDivisions) -> Load(AdminSubdivisions) -> Load(Hierarchies)
//!   -> Load(Features) -> Load(Timezones) -> Load(LanguageCodes)
//!   -> [Load(AlternateNames)] -> Load(Names, per name) -> Done
//! ```
//!
//! Stages run one at a time in this order and the first error ends the run.
//! Tables loaded before the failure keep their rows.

use crate::catalog::{DatasetCatalog, RemoteFile};
use crate::config::IngestConfig;
use crate::dataset::{DatasetLoader, BASE_LOAD_ORDER};
use crate::error::Result;
use crate::extract::ArchiveExtractor;
use crate::fetcher::Fetcher;
use crate::models::{FileState, WorkingFile};
use crate::seeder::MalformedPolicy;
use crate::worker::{LoadWorker, SeedRequest};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Requested dataset names; empty selects the configured default
    pub names: Vec<String>,
    /// Stop after fetching
    pub fetch_only: bool,
    /// Delete the working directory before fetching
    pub wipe_files: bool,
    /// Fetch and load the alternate names dump
    pub alternate_names: bool,
    pub malformed: MalformedPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Fetch,
    Load {
        loader: DatasetLoader,
        file: Option<String>,
    },
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resolve => f.write_str("Resolve"),
            Stage::Fetch => f.write_str("Fetch"),
            Stage::Load { loader, file: None } => write!(f, "Load({loader})"),
            Stage::Load {
                loader,
                file: Some(file),
            } => write!(f, "Load({loader}, {file})"),
            Stage::Done => f.write_str("Done"),
        }
    }
}

/// What a finished run did
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub files: Vec<WorkingFile>,
    /// Completed stages, in order
    pub stages: Vec<Stage>,
}

impl PipelineReport {
    pub fn transferred(&self) -> usize {
        self.files.iter().filter(|f| f.was_transferred()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.state == FileState::SkippedExisting)
            .count()
    }

    pub fn loads(&self) -> impl Iterator<Item = DatasetLoader> + '_ {
        self.stages.iter().filter_map(|s| match s {
            Stage::Load { loader, .. } => Some(*loader),
            _ => None,
        })
    }
}

/// The load stages of a run, in execution order
pub fn load_plan(
    working_dir: &Path,
    names: &[String],
    alternate_names: bool,
    malformed: MalformedPolicy,
) -> Vec<SeedRequest> {
    let mut plan: Vec<SeedRequest> = BASE_LOAD_ORDER
        .iter()
        .map(|loader| SeedRequest::new(*loader, working_dir).with_malformed(malformed))
        .collect();

    if alternate_names {
        plan.push(
            SeedRequest::new(DatasetLoader::AlternateNames, working_dir).with_malformed(malformed),
        );
    }

    plan.extend(names.iter().map(|name| {
        SeedRequest::new(DatasetLoader::Names, working_dir)
            .with_file(name.clone())
            .with_malformed(malformed)
    }));

    plan
}

/// A cache hit on an archive, left behind by an interrupted extraction
fn is_cached_archive(file: &WorkingFile, extractor: &ArchiveExtractor) -> bool {
    file.state == FileState::SkippedExisting && extractor.is_archive(&file.local_path)
}

pub struct PipelineOrchestrator<W> {
    config: IngestConfig,
    worker: W,
    fetcher: Fetcher,
    extractor: ArchiveExtractor,
}

impl<W: LoadWorker> PipelineOrchestrator<W> {
    pub fn new(config: IngestConfig, worker: W) -> Result<Self> {
        config.validate()?;

        let fetcher = Fetcher::new(&config)?;
        let extractor = ArchiveExtractor::new(&config.compressed_suffix, &config.plain_suffix);

        Ok(Self {
            config,
            worker,
            fetcher,
            extractor,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub async fn run(&self, options: &RunOptions) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        // Resolve
        let catalog = DatasetCatalog::new(&self.config);
        let names = catalog.requested_names(&options.names);
        let remotes = catalog.fetch_list(&names, options.alternate_names);
        info!(
            "Resolved {} file(s) for dataset(s): {}",
            remotes.len(),
            names.join(", ")
        );
        report.stages.push(Stage::Resolve);

        // Fetch
        self.prepare_working_dir(options.wipe_files).await?;
        for remote in &remotes {
            let file = self.fetch_one(remote).await?;
            report.files.push(file);
        }
        info!(
            transferred = report.transferred(),
            skipped = report.skipped(),
            "Fetch complete"
        );
        report.stages.push(Stage::Fetch);

        if options.fetch_only {
            info!("Fetch only, skipping loads");
            return Ok(report);
        }

        // Load
        let plan = load_plan(
            &self.config.working_dir,
            &names,
            options.alternate_names,
            options.malformed,
        );

        for request in plan {
            let stage = Stage::Load {
                loader: request.loader,
                file: request.file.clone(),
            };

            info!("Stage {} started", stage);
            self.worker.run(&request).await.inspect_err(|e| {
                warn!(stage = %stage, error = %e, "Stage failed, aborting remaining stages");
            })?;
            info!("Stage {} finished", stage);

            report.stages.push(stage);
        }

        report.stages.push(Stage::Done);
        info!("Import complete");

        Ok(report)
    }

    async fn fetch_one(&self, remote: &RemoteFile) -> Result<WorkingFile> {
        let mut file = self
            .fetcher
            .ensure_local(remote, &self.config.working_dir)
            .await?;

        if is_cached_archive(&file, &self.extractor) {
            warn!(
                path = %file.local_path.display(),
                "Cached file is still compressed and will not be extracted, rerun with --wipe-files"
            );
        }

        if file.state == FileState::Downloaded && self.extractor.is_archive(&file.local_path) {
            file.local_path = self
                .extractor
                .extract_async(file.local_path.clone())
                .await?;
            file.advance(FileState::Extracted);
        }

        Ok(file)
    }

    /// Create the working directory, wiping it first when asked
    async fn prepare_working_dir(&self, wipe: bool) -> Result<()> {
        let dir = &self.config.working_dir;

        if wipe && tokio::fs::try_exists(dir).await? {
            info!(dir = %dir.display(), "Wiping working directory");
            tokio::fs::remove_dir_all(dir).await?;
        }

        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }
}
