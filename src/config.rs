//! Server Configuration
//!
//! Everything comes from environment variables (a `.env` file is loaded by the
//! binary first). Unset variables fall back to defaults; set-but-invalid
//! values fail startup.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::crops::CROP_COUNT;
use crate::recommender::{LookupFailurePolicy, RecommenderSettings};
use crate::selection::SelectionPolicy;
use crate::utils::{DEFAULT_TEMPERATURE, DEFAULT_TOP_K};

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_MODEL_PATH: &str = "crop_predictor.json";
pub const DEFAULT_DUCKDB_PATH: &str = "crops.duckdb";

/// Which production store backend to use
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Memory,
    DuckDb { path: PathBuf },
    Supabase { url: String, key: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub store: StoreConfig,
    pub recommender: RecommenderSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let model_path = get("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let temperature: f64 = parse_or(get("TEMPERATURE_SCALE"), "TEMPERATURE_SCALE", DEFAULT_TEMPERATURE)?;
        if !(temperature.is_finite() && temperature > 0.0) {
            anyhow::bail!("TEMPERATURE_SCALE must be positive, got {}", temperature);
        }

        let top_k: usize = parse_or(get("TOP_K"), "TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 || top_k > CROP_COUNT {
            anyhow::bail!("TOP_K must be between 1 and {}, got {}", CROP_COUNT, top_k);
        }

        let policy = match get("SELECTION_POLICY") {
            Some(v) => v.parse::<SelectionPolicy>().context("Invalid SELECTION_POLICY")?,
            None => SelectionPolicy::default(),
        };

        let lookup_failure = match get("LOOKUP_FALLBACK") {
            Some(v) => v.parse::<LookupFailurePolicy>().context("Invalid LOOKUP_FALLBACK")?,
            None => LookupFailurePolicy::default(),
        };

        let backend = get("STORE_BACKEND").unwrap_or_else(|| "memory".to_string());
        let store = match backend.trim() {
            "memory" => StoreConfig::Memory,
            "duckdb" => StoreConfig::DuckDb {
                path: get("DUCKDB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DUCKDB_PATH)),
            },
            "supabase" => {
                let url = get("SUPABASE_URL")
                    .or_else(|| get("REACT_APP_SUPABASE_URL"))
                    .context("STORE_BACKEND=supabase requires SUPABASE_URL")?;
                let key = get("SUPABASE_KEY")
                    .or_else(|| get("REACT_APP_SUPABASE_ANON_KEY"))
                    .context("STORE_BACKEND=supabase requires SUPABASE_KEY")?;
                StoreConfig::Supabase { url, key }
            }
            other => anyhow::bail!("Unknown STORE_BACKEND: {}", other),
        };

        Ok(Self {
            port,
            model_path,
            store,
            recommender: RecommenderSettings {
                temperature,
                top_k,
                policy,
                lookup_failure,
            },
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {}: {}", key, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.model_path, PathBuf::from("crop_predictor.json"));
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.recommender.temperature, 1.5);
        assert_eq!(config.recommender.top_k, 3);
        assert_eq!(config.recommender.policy, SelectionPolicy::LeastProduced);
        assert_eq!(config.recommender.lookup_failure, LookupFailurePolicy::Substitute(0.0));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("MODEL_PATH", "/opt/models/crops.json"),
            ("TEMPERATURE_SCALE", "2.0"),
            ("SELECTION_POLICY", "production_ceiling:300"),
            ("LOOKUP_FALLBACK", "fail"),
            ("STORE_BACKEND", "duckdb"),
            ("DUCKDB_PATH", "/var/lib/crops.duckdb"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.recommender.temperature, 2.0);
        assert_eq!(config.recommender.policy, SelectionPolicy::ProductionCeiling(300.0));
        assert_eq!(config.recommender.lookup_failure, LookupFailurePolicy::Fail);
        assert_eq!(
            config.store,
            StoreConfig::DuckDb {
                path: PathBuf::from("/var/lib/crops.duckdb")
            }
        );
    }

    #[test]
    fn test_supabase_accepts_frontend_variable_names() {
        let config = config_from(&[
            ("STORE_BACKEND", "supabase"),
            ("REACT_APP_SUPABASE_URL", "https://x.supabase.co"),
            ("REACT_APP_SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Supabase {
                url: "https://x.supabase.co".into(),
                key: "anon".into()
            }
        );

        assert!(config_from(&[("STORE_BACKEND", "supabase")]).is_err());
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("TEMPERATURE_SCALE", "0")]).is_err());
        assert!(config_from(&[("TEMPERATURE_SCALE", "-1.5")]).is_err());
        assert!(config_from(&[("TOP_K", "0")]).is_err());
        assert!(config_from(&[("TOP_K", "23")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "redis")]).is_err());
        assert!(config_from(&[("SELECTION_POLICY", "random")]).is_err());
    }

    #[test]
    fn test_top_k_may_cover_every_crop() {
        let config = config_from(&[("TOP_K", "22")]).unwrap();
        assert_eq!(config.recommender.top_k, CROP_COUNT);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("PORT", "  "), ("STORE_BACKEND", "")]).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.store, StoreConfig::Memory);
    }
}
