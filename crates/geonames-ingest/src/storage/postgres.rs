//! PostgreSQL table store
//!
//! Each load runs in one transaction. Rows go in through multi-row
//! `INSERT ... VALUES` statements built with `QueryBuilder::push_values`,
//! binding every field with its column type so empty fields become NULL.

use super::{TableLoad, TableStore};
use crate::dataset::DatasetLoader;
use crate::error::Result;
use crate::models::{FieldValue, Record};
use crate::schema::RecordShape;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

/// Postgres caps a statement at 65535 bind parameters
pub const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TableStore for PgTableStore {
    async fn is_empty(&self, table: &str) -> Result<bool> {
        let sql = format!("SELECT NOT EXISTS (SELECT 1 FROM {table} LIMIT 1)");
        let empty: bool = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(empty)
    }

    async fn begin_load(&self, loader: DatasetLoader) -> Result<Box<dyn TableLoad>> {
        let tx = self.pool.begin().await?;
        debug!(table = loader.table(), "Transaction started");

        Ok(Box::new(PgTableLoad {
            tx,
            table: loader.table(),
            shape: loader.shape(),
        }))
    }
}

struct PgTableLoad {
    tx: Transaction<'static, Postgres>,
    table: &'static str,
    shape: &'static RecordShape,
}

/// `INSERT INTO table (c1, c2, ...) ` for a shape
fn insert_prefix(table: &str, shape: &RecordShape) -> String {
    let columns: Vec<&str> = shape.column_names().collect();
    format!("INSERT INTO {} ({}) ", table, columns.join(", "))
}

#[async_trait]
impl TableLoad for PgTableLoad {
    async fn insert_batch(&mut self, records: &[Record]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(insert_prefix(self.table, self.shape));

        query_builder.push_values(records.iter(), |mut b, record| {
            for value in &record.values {
                match value {
                    FieldValue::Text(v) => {
                        b.push_bind(v.clone());
                    }
                    FieldValue::Integer(v) => {
                        b.push_bind(*v);
                    }
                    FieldValue::Float(v) => {
                        b.push_bind(*v);
                    }
                    FieldValue::Boolean(v) => {
                        b.push_bind(*v);
                    }
                    FieldValue::Date(v) => {
                        b.push_bind(*v);
                    }
                }
            }
        });

        let result = query_builder.build().execute(&mut *self.tx).await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let table = self.table;
        self.tx.commit().await?;
        debug!(table, "Transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ADMIN_DIVISION, HIERARCHY};

    #[test]
    fn test_insert_prefix() {
        assert_eq!(
            insert_prefix("geonames_hierarchies", &HIERARCHY),
            "INSERT INTO geonames_hierarchies (parent_id, child_id, type) "
        );
        assert_eq!(
            insert_prefix("geonames_admin_subdivisions", &ADMIN_DIVISION),
            "INSERT INTO geonames_admin_subdivisions (code, name, name_ascii, name_id) "
        );
    }
}
