//! Crop Recommender - coordinates classifier, calibration and production store
//!
//! Recommend:
//! 1. Classifier → raw scores (one per crop)
//! 2. Temperature scaling → calibrated distribution
//! 3. Top-k extraction
//! 4. Production lookup per candidate (concurrent)
//! 5. Selection policy → recommendation
//!
//! Accumulate: validate the crop and increment, then delegate to the store.

use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::classifier::Classifier;
use crate::crops::{is_known_crop, CROP_NAMES};
use crate::error::{RecommenderError, RecommenderResult, ValidationError};
use crate::features::SoilClimateInput;
use crate::production_store::ProductionStore;
use crate::selection::{CandidateProduction, ProductionSource, SelectionPolicy};
use crate::utils::{temperature_scale, top_k, ScoredCandidate, DEFAULT_TEMPERATURE, DEFAULT_TOP_K};

/// What to do when a production lookup fails during recommendation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupFailurePolicy {
    /// Use this value as the candidate's production and carry on
    Substitute(f64),
    /// Fail the whole request
    Fail,
}

impl Default for LookupFailurePolicy {
    fn default() -> Self {
        LookupFailurePolicy::Substitute(0.0)
    }
}

impl fmt::Display for LookupFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailurePolicy::Substitute(v) => write!(f, "{}", v),
            LookupFailurePolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for LookupFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("fail") {
            return Ok(LookupFailurePolicy::Fail);
        }
        let value: f64 = s
            .parse()
            .map_err(|_| anyhow::anyhow!("Expected a number or 'fail', got '{}'", s))?;
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("Fallback production must be a non-negative number");
        }
        Ok(LookupFailurePolicy::Substitute(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    pub temperature: f64,
    pub top_k: usize,
    pub policy: SelectionPolicy,
    pub lookup_failure: LookupFailurePolicy,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            policy: SelectionPolicy::default(),
            lookup_failure: LookupFailurePolicy::default(),
        }
    }
}

/// Recommendation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub recommended_crop: String,
    pub probability: f64,
    pub production_value: f64,
    /// Every top-k candidate considered, in probability order
    pub candidates: Vec<CandidateProduction>,
}

pub struct CropRecommender {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn ProductionStore>,
    settings: RecommenderSettings,
}

impl CropRecommender {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ProductionStore>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            classifier,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn ProductionStore {
        self.store.as_ref()
    }

    /// Classifier + calibration + top-k (no store access)
    pub fn rank(&self, input: &SoilClimateInput) -> RecommenderResult<Vec<ScoredCandidate>> {
        let raw = self
            .classifier
            .predict_distribution(input)
            .map_err(|e| RecommenderError::Computation(e.to_string()))?;

        if raw.len() != CROP_NAMES.len() {
            return Err(RecommenderError::Computation(format!(
                "classifier returned {} scores for {} crops",
                raw.len(),
                CROP_NAMES.len()
            )));
        }

        let calibrated = temperature_scale(&raw, self.settings.temperature)
            .map_err(|e| RecommenderError::Computation(e.to_string()))?;

        top_k(&calibrated, &CROP_NAMES, self.settings.top_k)
            .map_err(|e| RecommenderError::Computation(e.to_string()))
    }

    /// Join ranked candidates with their production totals
    ///
    /// Lookups run concurrently. A failed lookup is replaced by the configured
    /// fallback and marked `ProductionSource::Fallback`, unless the policy is
    /// `LookupFailurePolicy::Fail`.
    pub async fn lookup_production(
        &self,
        ranked: Vec<ScoredCandidate>,
    ) -> RecommenderResult<Vec<CandidateProduction>> {
        let lookups = join_all(ranked.iter().map(|c| self.store.get_production(&c.crop))).await;

        ranked
            .into_iter()
            .zip(lookups)
            .map(|(candidate, lookup)| {
                let (production, production_source) = match lookup {
                    Ok(Some(value)) => (value, ProductionSource::Stored),
                    Ok(None) => (0.0, ProductionSource::Absent),
                    Err(e) => match self.settings.lookup_failure {
                        LookupFailurePolicy::Substitute(fallback) => {
                            tracing::warn!(
                                "Production lookup for '{}' failed, using {}: {}",
                                candidate.crop,
                                fallback,
                                e
                            );
                            (fallback, ProductionSource::Fallback)
                        }
                        LookupFailurePolicy::Fail => return Err(RecommenderError::from(e)),
                    },
                };
                Ok(CandidateProduction {
                    crop: candidate.crop,
                    probability: candidate.probability,
                    production,
                    production_source,
                })
            })
            .collect()
    }

    /// Full recommendation pipeline
    pub async fn recommend(&self, input: &SoilClimateInput) -> RecommenderResult<Recommendation> {
        let ranked = self.rank(input)?;
        tracing::debug!("Top candidates: {:?}", ranked);

        let candidates = self.lookup_production(ranked).await?;

        let chosen = self
            .settings
            .policy
            .select(&candidates)
            .cloned()
            .ok_or_else(|| RecommenderError::Computation("no candidates to select from".to_string()))?;

        tracing::info!(
            "Recommended '{}' (p={:.4}, production={}) via {}",
            chosen.crop,
            chosen.probability,
            chosen.production,
            self.settings.policy
        );

        Ok(Recommendation {
            recommended_crop: chosen.crop,
            probability: chosen.probability,
            production_value: chosen.production,
            candidates,
        })
    }

    /// Add `increment` to the crop's cumulative production; returns the new total
    pub async fn accumulate(&self, crop: &str, increment: f64) -> RecommenderResult<f64> {
        if !is_known_crop(crop) {
            return Err(ValidationError::InvalidLabel(crop.to_string()).into());
        }
        if !increment.is_finite() || increment < 0.0 {
            return Err(ValidationError::InvalidValue.into());
        }

        let total = self.store.increment_production(crop, increment).await?;
        tracing::info!("Production for '{}' is now {} (+{})", crop, total, increment);
        Ok(total)
    }

    /// Current total for a known crop (0 when absent). Store errors propagate.
    pub async fn production_of(&self, crop: &str) -> RecommenderResult<f64> {
        if !is_known_crop(crop) {
            return Err(ValidationError::InvalidLabel(crop.to_string()).into());
        }
        Ok(self.store.get_production(crop).await?.unwrap_or(0.0))
    }
}
