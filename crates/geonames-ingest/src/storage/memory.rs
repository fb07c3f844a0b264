//! In-memory table store
//!
//! Behaves like the database store for guard and commit semantics. Backs the
//! seeder and pipeline tests.

use super::{TableLoad, TableStore};
use crate::dataset::DatasetLoader;
use crate::error::Result;
use crate::models::Record;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Tables = Arc<Mutex<HashMap<String, Vec<Record>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put rows into `table` directly, bypassing any guard
    pub fn seed_rows(&self, table: &str, rows: Vec<Record>) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Committed rows of `table`
    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        lock(&self.tables).get(table).map_or(0, Vec::len)
    }
}

fn lock(tables: &Tables) -> MutexGuard<'_, HashMap<String, Vec<Record>>> {
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn is_empty(&self, table: &str) -> Result<bool> {
        Ok(self.row_count(table) == 0)
    }

    async fn begin_load(&self, loader: DatasetLoader) -> Result<Box<dyn TableLoad>> {
        Ok(Box::new(MemoryLoad {
            tables: Arc::clone(&self.tables),
            table: loader.table(),
            pending: Vec::new(),
        }))
    }
}

struct MemoryLoad {
    tables: Tables,
    table: &'static str,
    pending: Vec<Record>,
}

#[async_trait]
impl TableLoad for MemoryLoad {
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64> {
        self.pending.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryLoad {
            tables,
            table,
            pending,
        } = *self;

        lock(&tables).entry(table.to_string()).or_default().extend(pending);
        Ok(())
    }
}
