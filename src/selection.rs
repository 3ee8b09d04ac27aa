//! Recommendation Selection
//!
//! Picks one crop out of the top-k candidates once their production totals
//! are known. The default favours under-supplied crops: among the most
//! suitable candidates, recommend the one with the least recorded production.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Where a candidate's production value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionSource {
    /// Read from the store
    Stored,
    /// No record for this crop yet (counts as 0)
    Absent,
    /// Store lookup failed; the configured fallback value was substituted
    Fallback,
}

/// A top-k candidate joined with its production total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProduction {
    pub crop: String,
    pub probability: f64,
    pub production: f64,
    pub production_source: ProductionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionPolicy {
    /// Minimum production; ties go to the more probable candidate
    #[default]
    LeastProduced,
    /// Ignore production and take the top candidate
    HighestProbability,
    /// Most probable candidate with production at or below the ceiling,
    /// otherwise `LeastProduced`
    ProductionCeiling(f64),
}

impl SelectionPolicy {
    /// Candidates are expected in descending probability order
    pub fn select<'a>(&self, candidates: &'a [CandidateProduction]) -> Option<&'a CandidateProduction> {
        match self {
            SelectionPolicy::LeastProduced => least_produced(candidates),
            SelectionPolicy::HighestProbability => candidates.first(),
            SelectionPolicy::ProductionCeiling(ceiling) => candidates
                .iter()
                .find(|c| c.production <= *ceiling)
                .or_else(|| least_produced(candidates)),
        }
    }
}

/// First candidate holding the strict minimum
fn least_produced(candidates: &[CandidateProduction]) -> Option<&CandidateProduction> {
    candidates.iter().fold(None, |best: Option<&CandidateProduction>, c| match best {
        Some(b) if b.production <= c.production => Some(b),
        _ => Some(c),
    })
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::LeastProduced => write!(f, "least_produced"),
            SelectionPolicy::HighestProbability => write!(f, "highest_probability"),
            SelectionPolicy::ProductionCeiling(c) => write!(f, "production_ceiling:{}", c),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        match s {
            "least_produced" => Ok(SelectionPolicy::LeastProduced),
            "highest_probability" => Ok(SelectionPolicy::HighestProbability),
            _ => {
                let ceiling = s
                    .strip_prefix("production_ceiling:")
                    .ok_or_else(|| anyhow::anyhow!("Unknown selection policy: {}", s))?;
                let ceiling: f64 = ceiling
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid production ceiling: {}", ceiling))?;
                if !ceiling.is_finite() || ceiling < 0.0 {
                    anyhow::bail!("Production ceiling must be a non-negative number");
                }
                Ok(SelectionPolicy::ProductionCeiling(ceiling))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(crop: &str, probability: f64, production: f64) -> CandidateProduction {
        CandidateProduction {
            crop: crop.to_string(),
            probability,
            production,
            production_source: ProductionSource::Stored,
        }
    }

    fn top3() -> Vec<CandidateProduction> {
        vec![
            candidate("rice", 0.5, 500.0),
            candidate("jute", 0.3, 100.0),
            candidate("coconut", 0.2, 50.0),
        ]
    }

    #[test]
    fn test_least_produced_picks_minimum() {
        let candidates = top3();
        let chosen = SelectionPolicy::LeastProduced.select(&candidates).unwrap();
        assert_eq!(chosen.crop, "coconut");
        for other in &candidates {
            assert!(chosen.production <= other.production);
        }
    }

    #[test]
    fn test_least_produced_tie_keeps_first() {
        let candidates = vec![
            candidate("rice", 0.5, 10.0),
            candidate("jute", 0.3, 0.0),
            candidate("coconut", 0.2, 0.0),
        ];
        let chosen = SelectionPolicy::LeastProduced.select(&candidates).unwrap();
        assert_eq!(chosen.crop, "jute");
    }

    #[test]
    fn test_highest_probability() {
        let candidates = top3();
        let chosen = SelectionPolicy::HighestProbability.select(&candidates).unwrap();
        assert_eq!(chosen.crop, "rice");
    }

    #[test]
    fn test_ceiling_prefers_probability_under_limit() {
        let candidates = top3();
        let chosen = SelectionPolicy::ProductionCeiling(150.0).select(&candidates).unwrap();
        assert_eq!(chosen.crop, "jute");

        // Nothing under the ceiling: fall back to least produced
        let chosen = SelectionPolicy::ProductionCeiling(10.0).select(&candidates).unwrap();
        assert_eq!(chosen.crop, "coconut");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(SelectionPolicy::LeastProduced.select(&[]).is_none());
        assert!(SelectionPolicy::HighestProbability.select(&[]).is_none());
    }

    #[test]
    fn test_parse_round_trip() {
        for policy in [
            SelectionPolicy::LeastProduced,
            SelectionPolicy::HighestProbability,
            SelectionPolicy::ProductionCeiling(250.5),
        ] {
            assert_eq!(policy.to_string().parse::<SelectionPolicy>().unwrap(), policy);
        }
        assert!("cheapest".parse::<SelectionPolicy>().is_err());
        assert!("production_ceiling:-3".parse::<SelectionPolicy>().is_err());
        assert!("production_ceiling:lots".parse::<SelectionPolicy>().is_err());
    }
}
