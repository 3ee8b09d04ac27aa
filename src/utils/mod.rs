//! Probability post-processing
//!
//! - Calibration: temperature-scaled softmax over raw classifier scores
//! - Ranking: top-k extraction with a deterministic tie-break

pub mod calibration;
pub mod ranking;

// Re-export commonly used items
pub use calibration::{temperature_scale, DEFAULT_TEMPERATURE};
pub use ranking::{top_k, ScoredCandidate, DEFAULT_TOP_K};
