//! Geonames Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ambient services shared by the geonames workspace members:
//!
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Database**: PostgreSQL pool configuration via [`db::DbConfig`]
//!
//! # Example
//!
//! ```no_run
//! use geonames_common::db::{create_pool, DbConfig};
//! use geonames_common::logging::{init_logging, LogConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let pool = create_pool(&DbConfig::from_env()?).await?;
//!     drop(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod logging;

pub use db::{DbConfig, DbError};
