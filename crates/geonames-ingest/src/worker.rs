//! Load workers
//!
//! The orchestrator hands each load stage to a [`LoadWorker`] and waits for
//! it to finish before starting the next. Two implementations:
//!
//! - [`ProcessLoadWorker`] runs `geonames seed ...` as a child process and
//!   fails with the child's captured output when it exits unsuccessfully
//! - [`InProcessLoadWorker`] calls the [`Seeder`] directly

use crate::dataset::DatasetLoader;
use crate::error::{IngestError, Result};
use crate::seeder::{MalformedPolicy, Seeder};
use crate::storage::TableStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Arguments of one load stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRequest {
    pub loader: DatasetLoader,
    /// Working directory holding the source files
    pub path: PathBuf,
    /// Names file, for the names loader
    pub file: Option<String>,
    pub malformed: MalformedPolicy,
}

impl SeedRequest {
    pub fn new(loader: DatasetLoader, path: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            path: path.into(),
            file: None,
            malformed: MalformedPolicy::Abort,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    /// Command line of the `seed` command for this request
    ///
    /// Always carries `--force`: the orchestrator has already decided to run.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "seed".to_string(),
            format!("--class={}", self.loader.class_name()),
            format!("--path={}", self.path.display()),
        ];

        if let Some(ref file) = self.file {
            args.push(format!("--file={file}"));
        }

        args.push("--force".to_string());

        if self.malformed == MalformedPolicy::Skip {
            args.push("--skip-malformed".to_string());
        }

        args
    }
}

#[async_trait]
pub trait LoadWorker: Send + Sync {
    /// Run one stage to completion
    async fn run(&self, request: &SeedRequest) -> Result<()>;
}

// ============================================================================
// Subprocess worker
// ============================================================================

pub struct ProcessLoadWorker {
    program: PathBuf,
    base_args: Vec<String>,
}

impl ProcessLoadWorker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Worker that re-invokes the running binary
    pub fn current_exe() -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Arguments placed before the `seed ...` arguments
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl LoadWorker for ProcessLoadWorker {
    async fn run(&self, request: &SeedRequest) -> Result<()> {
        let args = request.to_args();
        debug!(program = %self.program.display(), ?args, "Spawning load worker");

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(IngestError::Stage {
                class: request.loader.class_name().to_string(),
                output: format!("{stdout}{stderr}"),
            });
        }

        for line in stdout.lines().chain(stderr.lines()) {
            debug!(class = request.loader.class_name(), "{}", line);
        }

        Ok(())
    }
}

// ============================================================================
// In-process worker
// ============================================================================

pub struct InProcessLoadWorker<S> {
    seeder: Seeder<S>,
}

impl<S: TableStore> InProcessLoadWorker<S> {
    pub fn new(seeder: Seeder<S>) -> Self {
        Self { seeder }
    }

    pub fn seeder(&self) -> &Seeder<S> {
        &self.seeder
    }
}

#[async_trait]
impl<S: TableStore> LoadWorker for InProcessLoadWorker<S> {
    async fn run(&self, request: &SeedRequest) -> Result<()> {
        self.seeder.seed(request).await.map(|_| ())
    }
}
