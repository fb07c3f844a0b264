//! Geonames Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Fetches the geonames.org dump files and loads them into PostgreSQL.
//!
//! # Pipeline
//!
//! - [`catalog`]: dataset names to remote files
//! - [`fetcher`]: idempotent downloads into the working directory
//! - [`extract`]: zip archives to their `.txt` member
//! - [`parser`]: streaming TSV into typed [`models::Record`]s
//! - [`storage`]: empty-table guard and table loads
//! - [`seeder`]: one dataset's load stage
//! - [`pipeline`]: stage ordering, fetch-only and wipe modes
//!
//! # Example
//!
//! ```no_run
//! use geonames_ingest::pipeline::{PipelineOrchestrator, RunOptions};
//! use geonames_ingest::worker::ProcessLoadWorker;
//! use geonames_ingest::IngestConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let orchestrator = PipelineOrchestrator::new(config, ProcessLoadWorker::current_exe()?)?;
//!
//!     let options = RunOptions {
//!         names: vec!["AD".to_string()],
//!         ..RunOptions::default()
//!     };
//!     orchestrator.run(&options).await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod seeder;
pub mod storage;
pub mod worker;

pub use config::IngestConfig;
pub use dataset::DatasetLoader;
pub use error::{IngestError, Result};
