//! Hosted production store (Supabase / PostgREST)
//!
//! Table `crops(crop_name text primary key, production double precision)`.
//!
//! PostgREST has no increment primitive, so accumulation is a compare-and-swap:
//! the PATCH is filtered on the production value we read, and an empty result
//! means another writer got there first. Inserting a new row relies on the
//! primary key rejecting duplicates (HTTP 409). Either conflict re-reads and
//! retries, up to `MAX_CAS_ATTEMPTS`.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ProductionStore;
use crate::error::StoreError;

const TABLE: &str = "crops";
const MAX_CAS_ATTEMPTS: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ProductionRow {
    production: f64,
}

#[derive(Debug, Serialize)]
struct NewRow<'a> {
    crop_name: &'a str,
    production: f64,
}

#[derive(Debug, Serialize)]
struct ProductionPatch {
    production: f64,
}

pub struct SupabaseProductionStore {
    client: Client,
    table_url: String,
}

impl SupabaseProductionStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(api_key)?);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), TABLE),
        })
    }

    /// Cheap reachability check used at startup
    pub async fn ping(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(&self.table_url)
            .query(&[("select", "crop_name"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Supabase table '{}' not reachable: HTTP {}", TABLE, response.status());
        }
        tracing::info!("Supabase production store reachable");
        Ok(())
    }

    async fn fetch(&self, crop: &str) -> Result<Option<f64>, StoreError> {
        let rows: Vec<ProductionRow> = self
            .client
            .get(&self.table_url)
            .query(&[("select", "production".to_string()), ("crop_name", format!("eq.{}", crop))])
            .send()
            .await
            .map_err(backend)?
            .error_for_status()
            .map_err(backend)?
            .json()
            .await
            .map_err(backend)?;
        Ok(rows.first().map(|r| r.production))
    }

    /// Insert a fresh row; `Ok(false)` if someone else created it first
    async fn try_insert(&self, crop: &str, production: f64) -> Result<bool, StoreError> {
        let response = self
            .client
            .post(&self.table_url)
            .header("Prefer", "return=minimal")
            .json(&NewRow { crop_name: crop, production })
            .send()
            .await
            .map_err(backend)?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        response.error_for_status().map_err(backend)?;
        Ok(true)
    }

    /// Update only if the stored value still equals `expected`
    async fn try_swap(&self, crop: &str, expected: f64, production: f64) -> Result<bool, StoreError> {
        let updated: Vec<ProductionRow> = self
            .client
            .patch(&self.table_url)
            .query(&[
                ("crop_name", format!("eq.{}", crop)),
                ("production", format!("eq.{}", expected)),
            ])
            .header("Prefer", "return=representation")
            .json(&ProductionPatch { production })
            .send()
            .await
            .map_err(backend)?
            .error_for_status()
            .map_err(backend)?
            .json()
            .await
            .map_err(backend)?;
        Ok(!updated.is_empty())
    }
}

fn backend(e: reqwest::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl ProductionStore for SupabaseProductionStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn get_production(&self, crop: &str) -> Result<Option<f64>, StoreError> {
        self.fetch(crop).await
    }

    async fn increment_production(&self, crop: &str, delta: f64) -> Result<f64, StoreError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let committed = match self.fetch(crop).await? {
                None => {
                    let total = delta;
                    self.try_insert(crop, total).await?.then_some(total)
                }
                Some(current) => {
                    let total = current + delta;
                    self.try_swap(crop, current, total).await?.then_some(total)
                }
            };

            if let Some(total) = committed {
                return Ok(total);
            }
            tracing::debug!("Production update for '{}' lost a race (attempt {})", crop, attempt);
        }

        Err(StoreError::Conflict {
            crop: crop.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }
}
