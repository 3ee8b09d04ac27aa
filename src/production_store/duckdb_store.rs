//! Embedded DuckDB production store
//!
//! One connection behind a mutex; blocking calls run on tokio's blocking pool.
//! Increments are a single UPSERT, so concurrent writers cannot lose updates.

use async_trait::async_trait;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::ProductionStore;
use crate::error::StoreError;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS crops (
        crop_name VARCHAR PRIMARY KEY,
        production DOUBLE NOT NULL DEFAULT 0
    )
"#;

const SELECT_PRODUCTION: &str = "SELECT production FROM crops WHERE crop_name = ?";

const UPSERT_PRODUCTION: &str = r#"
    INSERT INTO crops (crop_name, production) VALUES (?, ?)
    ON CONFLICT (crop_name) DO UPDATE SET production = production + EXCLUDED.production
    RETURNING production
"#;

pub struct DuckDbProductionStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbProductionStore {
    /// Open (or create) the database file and ensure the table exists
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open DuckDB at {:?}: {}", path, e))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| anyhow::anyhow!("Failed to open in-memory DuckDB: {}", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| anyhow::anyhow!("Failed to create crops table: {}", e))?;
        tracing::info!("DuckDB production store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> duckdb::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("DuckDB connection lock poisoned".to_string()))?;
            f(&guard).map_err(|e| StoreError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl ProductionStore for DuckDbProductionStore {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    async fn get_production(&self, crop: &str) -> Result<Option<f64>, StoreError> {
        let crop = crop.to_string();
        self.with_conn(move |conn| {
            match conn.query_row(SELECT_PRODUCTION, params![crop], |row| row.get::<_, f64>(0)) {
                Ok(value) => Ok(Some(value)),
                Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn increment_production(&self, crop: &str, delta: f64) -> Result<f64, StoreError> {
        let crop = crop.to_string();
        self.with_conn(move |conn| {
            conn.query_row(UPSERT_PRODUCTION, params![crop, delta], |row| row.get::<_, f64>(0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_accumulates() {
        let store = DuckDbProductionStore::in_memory().unwrap();
        assert_eq!(store.get_production("mango").await.unwrap(), None);
        assert_eq!(store.increment_production("mango", 25.0).await.unwrap(), 25.0);
        assert_eq!(store.increment_production("mango", 25.0).await.unwrap(), 50.0);
        assert_eq!(store.increment_production("mango", 0.0).await.unwrap(), 50.0);
        assert_eq!(store.get_production("mango").await.unwrap(), Some(50.0));
    }

    #[tokio::test]
    async fn test_totals_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crops.duckdb");

        {
            let store = DuckDbProductionStore::open(&path).unwrap();
            store.increment_production("rice", 120.5).await.unwrap();
        }

        let store = DuckDbProductionStore::open(&path).unwrap();
        assert_eq!(store.get_production("rice").await.unwrap(), Some(120.5));
    }
}
