//! Load destinations
//!
//! A [`TableStore`] answers emptiness checks and opens one [`TableLoad`] per
//! dataset stage. A load buffers or transacts its inserts and only makes them
//! visible on [`TableLoad::commit`]; dropping it uncommitted discards them.

use crate::dataset::DatasetLoader;
use crate::error::{IngestError, Result};
use crate::models::Record;
use async_trait::async_trait;
use tracing::debug;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgTableStore;

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Whether `table` currently holds no rows
    async fn is_empty(&self, table: &str) -> Result<bool>;

    /// Start loading the table of `loader`
    async fn begin_load(&self, loader: DatasetLoader) -> Result<Box<dyn TableLoad>>;
}

#[async_trait]
pub trait TableLoad: Send {
    /// Insert `records`, returning the number of rows written
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Duplicate-import guard
///
/// Only detects a non-empty table. An interrupted earlier load that left
/// rows behind trips it too; one that left none does not.
pub struct LoadGuard<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: TableStore + ?Sized> LoadGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn assert_empty(&self, table: &str) -> Result<()> {
        if !self.store.is_empty(table).await? {
            return Err(IngestError::NonEmptyTable {
                table: table.to_string(),
            });
        }

        debug!(table, "Table is empty");
        Ok(())
    }
}
