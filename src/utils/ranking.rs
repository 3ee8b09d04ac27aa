//! Top-K Extraction
//!
//! Picks the k most probable labels from a calibrated distribution.
//! Ties keep original label order (stable sort), so the lower index wins.

use anyhow::Result;
use serde::Serialize;

/// Number of candidates passed on to production lookup
pub const DEFAULT_TOP_K: usize = 3;

/// A label and its calibrated probability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub crop: String,
    pub probability: f64,
}

/// Top `k` (label, probability) pairs, descending by probability
pub fn top_k(probabilities: &[f64], labels: &[&str], k: usize) -> Result<Vec<ScoredCandidate>> {
    if probabilities.len() != labels.len() {
        anyhow::bail!(
            "Distribution has {} entries but label set has {}",
            probabilities.len(),
            labels.len()
        );
    }
    if k == 0 {
        anyhow::bail!("Requested zero candidates");
    }
    if probabilities.len() < k {
        anyhow::bail!(
            "Cannot extract top {} from a distribution of {} labels",
            k,
            probabilities.len()
        );
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    Ok(order
        .into_iter()
        .take(k)
        .map(|i| ScoredCandidate {
            crop: labels[i].to_string(),
            probability: probabilities[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const LABELS: [&str; 5] = ["a", "b", "c", "d", "e"];

    #[test]
    fn test_picks_highest_descending() {
        let probs = [0.1, 0.4, 0.05, 0.3, 0.15];
        let top = top_k(&probs, &LABELS, 3).unwrap();
        let crops: Vec<&str> = top.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(crops, vec!["b", "d", "e"]);
        assert_eq!(top[0].probability, 0.4);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let probs = [0.2, 0.2, 0.2, 0.2, 0.2];
        let top = top_k(&probs, &LABELS, 3).unwrap();
        let crops: Vec<&str> = top.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(crops, vec!["a", "b", "c"]);

        let probs = [0.1, 0.3, 0.1, 0.3, 0.2];
        let top = top_k(&probs, &LABELS, 3).unwrap();
        let crops: Vec<&str> = top.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(crops, vec!["b", "d", "e"]);
    }

    #[test]
    fn test_always_three_strictly_descending() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(3..30);
            let probs: Vec<f64> = (0..len).map(|_| rng.gen_range(0.0..1.0)).collect();
            let names: Vec<String> = (0..len).map(|i| format!("crop{}", i)).collect();
            let labels: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

            let top = top_k(&probs, &labels, 3).unwrap();
            assert_eq!(top.len(), 3);
            assert!(top[0].probability > top[1].probability);
            assert!(top[1].probability > top[2].probability);

            let max = probs.iter().cloned().fold(f64::MIN, f64::max);
            assert_eq!(top[0].probability, max);
        }
    }

    #[test]
    fn test_fails_when_too_few_labels() {
        assert!(top_k(&[0.5, 0.5], &["a", "b"], 3).is_err());
    }

    #[test]
    fn test_fails_on_length_mismatch() {
        assert!(top_k(&[0.5, 0.3, 0.2], &LABELS, 3).is_err());
    }
}
