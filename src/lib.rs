//! Crop Recommender
//!
//! Ranks crops for a set of soil/climate measurements using a pre-trained
//! classifier, then prefers the least-produced crop among the top candidates.
//!
//! Layout:
//! - `features`: 7-field input vector and request validation
//! - `classifier`: artifact loading and raw score prediction
//! - `utils/`: temperature scaling and top-k extraction
//! - `production_store/`: cumulative production backends
//! - `selection`: candidate selection policies
//! - `recommender`: the recommend/accumulate pipeline
//! - `api_server`: Axum HTTP surface (`api` feature)

pub mod classifier;
pub mod config;
pub mod crops;
pub mod error;
pub mod features;
pub mod production_store;
pub mod recommender;
pub mod selection;
pub mod utils;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use classifier::{Classifier, ModelArtifact};
pub use config::{ServerConfig, StoreConfig};
pub use crops::{CROP_COUNT, CROP_NAMES};
pub use error::{RecommenderError, StoreError, ValidationError};
pub use features::{SoilClimateInput, FEATURE_NAMES};
pub use production_store::{InMemoryProductionStore, ProductionStore};
pub use recommender::{CropRecommender, LookupFailurePolicy, Recommendation, RecommenderSettings};
pub use selection::{CandidateProduction, ProductionSource, SelectionPolicy};
pub use utils::{temperature_scale, top_k, ScoredCandidate};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
