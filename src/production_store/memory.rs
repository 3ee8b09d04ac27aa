//! In-process production totals
//!
//! A single mutex guards the map, so increments are atomic and the
//! lost-update race of a read-then-write cannot happen here.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::Mutex;

use super::ProductionStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryProductionStore {
    totals: Mutex<FxHashMap<String, f64>>,
}

impl InMemoryProductionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing totals
    pub fn with_totals<I, S>(totals: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let map = totals.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            totals: Mutex::new(map),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<String, f64>>, StoreError> {
        self.totals
            .lock()
            .map_err(|_| StoreError::Backend("production map lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductionStore for InMemoryProductionStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_production(&self, crop: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.lock()?.get(crop).copied())
    }

    async fn increment_production(&self, crop: &str, delta: f64) -> Result<f64, StoreError> {
        let mut totals = self.lock()?;
        let total = totals.entry(crop.to_string()).or_insert(0.0);
        *total += delta;
        Ok(*total)
    }
}
