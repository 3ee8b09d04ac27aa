//! Production Store
//!
//! Cumulative production totals keyed by crop name. The recommender only needs
//! two operations: read a total, and add to it.
//!
//! Backends:
//! - `memory`: process-local map (default, also used in tests)
//! - `duckdb`: embedded file database (`duckdb-store` feature)
//! - `supabase`: hosted PostgREST table (`supabase-store` feature)

pub mod memory;
#[cfg(feature = "duckdb-store")]
pub mod duckdb_store;
#[cfg(feature = "supabase-store")]
pub mod supabase;

pub use memory::InMemoryProductionStore;
#[cfg(feature = "duckdb-store")]
pub use duckdb_store::DuckDbProductionStore;
#[cfg(feature = "supabase-store")]
pub use supabase::SupabaseProductionStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::StoreError;

#[async_trait]
pub trait ProductionStore: Send + Sync {
    /// Backend name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Stored total, or `None` when the crop has no record yet
    async fn get_production(&self, crop: &str) -> Result<Option<f64>, StoreError>;

    /// Add `delta` to the crop's total (creating it at `delta` if absent) and
    /// return the new total
    async fn increment_production(&self, crop: &str, delta: f64) -> Result<f64, StoreError>;
}

/// Build the backend selected in configuration
pub async fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn ProductionStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(InMemoryProductionStore::new())),

        #[cfg(feature = "duckdb-store")]
        StoreConfig::DuckDb { path } => Ok(Arc::new(DuckDbProductionStore::open(path)?)),
        #[cfg(not(feature = "duckdb-store"))]
        StoreConfig::DuckDb { .. } => {
            anyhow::bail!("STORE_BACKEND=duckdb requires the `duckdb-store` feature")
        }

        #[cfg(feature = "supabase-store")]
        StoreConfig::Supabase { url, key } => {
            let store = SupabaseProductionStore::new(url, key)?;
            store.ping().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "supabase-store"))]
        StoreConfig::Supabase { .. } => {
            anyhow::bail!("STORE_BACKEND=supabase requires the `supabase-store` feature")
        }
    }
}
