//! Error taxonomy
//!
//! - `ValidationError`: bad caller input, reported as 4xx, never retried
//! - `RecommenderError::Computation`: classifier or calibration failure (5xx)
//! - `StoreError`: production store failure. Lookups substitute the configured
//!   fallback; accumulation writes surface it.

use thiserror::Error;

/// Input rejected before any classifier or store call is made
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No data provided")]
    NoData,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid numeric values provided: {}", .0.join(", "))]
    InvalidNumber(Vec<String>),

    #[error("pH must be between 0 and 14")]
    PhOutOfRange(f64),

    #[error("Humidity must be between 0 and 100")]
    HumidityOutOfRange(f64),

    #[error("Invalid crop name: {0}")]
    InvalidLabel(String),

    #[error("Invalid production value")]
    InvalidValue,
}

/// Production store failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("production store error: {0}")]
    Backend(String),

    #[error("concurrent updates to '{crop}' kept conflicting after {attempts} attempts")]
    Conflict { crop: String, attempts: u32 },
}

#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Prediction failed: {0}")]
    Computation(String),

    #[error(transparent)]
    Collaborator(#[from] StoreError),
}

pub type RecommenderResult<T> = std::result::Result<T, RecommenderError>;
