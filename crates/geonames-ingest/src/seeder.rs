//! Loading stage for one dataset
//!
//! guard -> parse -> batch insert -> commit. Parsing runs on the blocking
//! pool and hands batches to the async side over a bounded channel, so a
//! large file never sits in memory as a whole.

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_LINE_LENGTH};
use crate::dataset::DatasetLoader;
use crate::error::{IngestError, Result};
use crate::models::Record;
use crate::parser::RecordParser;
use crate::schema::RecordShape;
use crate::storage::postgres::MAX_BIND_PARAMS;
use crate::storage::{LoadGuard, TableStore};
use crate::worker::SeedRequest;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Batches parsed ahead of the inserter
const CHANNEL_CAPACITY: usize = 4;

/// What to do with a line that does not fit its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Fail the stage, leaving the table empty
    #[default]
    Abort,
    /// Log, count and move on
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub dataset: DatasetLoader,
    pub rows_inserted: u64,
    pub skipped_lines: usize,
}

pub struct Seeder<S> {
    store: S,
    batch_size: usize,
    max_line_length: usize,
    plain_suffix: String,
}

impl<S: TableStore> Seeder<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            plain_suffix: ".txt".to_string(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn with_plain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.plain_suffix = suffix.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rows per INSERT for `shape`, within the bind parameter limit
    fn rows_per_batch(&self, shape: &RecordShape) -> usize {
        let per_statement = MAX_BIND_PARAMS / shape.columns.len().max(1);
        self.batch_size.min(per_statement).max(1)
    }

    /// Load one dataset into its empty table
    pub async fn seed(&self, request: &SeedRequest) -> Result<LoadStats> {
        let loader = request.loader;
        let table = loader.table();

        LoadGuard::new(&self.store).assert_empty(table).await?;

        info!(dataset = %loader, table, "Seeding started");

        let mut load = self.store.begin_load(loader).await?;
        let batch_size = self.rows_per_batch(loader.shape());
        let mut rows_inserted = 0u64;

        let skipped_lines = if let Some(records) = loader.builtin_records() {
            for batch in records.chunks(batch_size) {
                rows_inserted += load.insert_batch(batch).await?;
            }
            0
        } else {
            let path = loader
                .source_path(&request.path, request.file.as_deref(), &self.plain_suffix)?
                .ok_or_else(|| {
                    IngestError::config(format!("{loader} has no source file"))
                })?;

            let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
            let producer = spawn_parser(
                path.clone(),
                loader.shape(),
                self.max_line_length,
                batch_size,
                request.malformed,
                tx,
            );

            while let Some(batch) = rx.recv().await {
                rows_inserted += load.insert_batch(&batch?).await?;
            }

            producer.await.map_err(|e| {
                IngestError::Io(std::io::Error::other(format!(
                    "parser task for {} failed: {e}",
                    path.display()
                )))
            })?
        };

        load.commit().await?;

        if skipped_lines > 0 {
            warn!(dataset = %loader, skipped_lines, "Malformed lines skipped");
        }
        info!(dataset = %loader, table, rows_inserted, "Seeding finished");

        Ok(LoadStats {
            dataset: loader,
            rows_inserted,
            skipped_lines,
        })
    }
}

/// Parse `path` on the blocking pool, sending full batches to `tx`
///
/// The task ends early when the receiver is gone or after sending an error.
/// Returns the number of skipped malformed lines.
fn spawn_parser(
    path: PathBuf,
    shape: &'static RecordShape,
    max_line_length: usize,
    batch_size: usize,
    policy: MalformedPolicy,
    tx: mpsc::Sender<Result<Vec<Record>>>,
) -> tokio::task::JoinHandle<usize> {
    tokio::task::spawn_blocking(move || {
        let parser = match RecordParser::open(&path, shape) {
            Ok(parser) => parser.with_max_line_length(max_line_length),
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return 0;
            }
        };

        let mut skipped = 0usize;
        let mut batch = Vec::with_capacity(batch_size);

        for item in parser {
            match item {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() == batch_size {
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                        if tx.blocking_send(Ok(full)).is_err() {
                            return skipped;
                        }
                    }
                }
                Err(e) if e.is_malformed_record() && policy == MalformedPolicy::Skip => {
                    warn!(error = %e, "Skipping malformed line");
                    skipped += 1;
                }
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    return skipped;
                }
            }
        }

        if !batch.is_empty() {
            let _ = tx.blocking_send(Ok(batch));
        }

        skipped
    })
}
