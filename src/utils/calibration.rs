//! Temperature Scaling
//!
//! Rescales classifier scores before renormalizing them into a distribution:
//!
//! ```text
//! output[i] = exp(raw[i] / T) / Σ_j exp(raw[j] / T)
//! ```
//!
//! Scaling is applied to the raw score magnitudes directly (the classifier
//! already emits probability-like values, not log-odds). Larger T flattens the
//! distribution, smaller T sharpens it toward the arg-max.

use anyhow::Result;

/// Default temperature used by the recommendation endpoint
pub const DEFAULT_TEMPERATURE: f64 = 1.5;

/// Temperature-scaled softmax over raw scores
///
/// The maximum scaled score is subtracted before exponentiating. This leaves
/// the result unchanged but keeps `exp` from overflowing on large scores.
pub fn temperature_scale(raw: &[f64], temperature: f64) -> Result<Vec<f64>> {
    if !(temperature.is_finite() && temperature > 0.0) {
        anyhow::bail!("Temperature must be a positive finite number, got {}", temperature);
    }
    if raw.is_empty() {
        anyhow::bail!("Cannot calibrate an empty score vector");
    }
    if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
        anyhow::bail!("Score vector contains a non-finite value: {}", bad);
    }

    let max_scaled = raw
        .iter()
        .map(|v| v / temperature)
        .fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = raw
        .iter()
        .map(|v| (v / temperature - max_scaled).exp())
        .collect();
    let total: f64 = exps.iter().sum();

    Ok(exps.into_iter().map(|e| e / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_known_values() {
        // exp(1/1.5) / (exp(1/1.5) + exp(0)) = 0.66076...
        let out = temperature_scale(&[1.0, 0.0], 1.5).unwrap();
        assert_relative_eq!(out[0], 0.660756, epsilon = 1e-5);
        assert_relative_eq!(out[1], 0.339244, epsilon = 1e-5);
    }

    #[test]
    fn test_equal_scores_are_uniform() {
        let out = temperature_scale(&[0.3; 22], DEFAULT_TEMPERATURE).unwrap();
        for p in out {
            assert_relative_eq!(p, 1.0 / 22.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sums_to_one_and_bounded() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(1..40);
            let raw: Vec<f64> = (0..len).map(|_| rng.gen_range(0.0..1.0)).collect();
            let t = rng.gen_range(0.01..10.0);
            let out = temperature_scale(&raw, t).unwrap();

            assert_eq!(out.len(), raw.len());
            assert_relative_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
            assert!(out.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_monotonic_for_any_temperature() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let raw: Vec<f64> = (0..22).map(|_| rng.gen_range(0.0..1.0)).collect();
            let t = rng.gen_range(0.05..20.0);
            let out = temperature_scale(&raw, t).unwrap();

            for i in 0..raw.len() {
                for j in 0..raw.len() {
                    if raw[i] > raw[j] {
                        assert!(
                            out[i] > out[j],
                            "raw[{}]={} > raw[{}]={} but scaled {} <= {} (T={})",
                            i, raw[i], j, raw[j], out[i], out[j], t
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_temperature_controls_sharpness() {
        let raw = [0.9, 0.05, 0.05];
        let sharp = temperature_scale(&raw, 0.05).unwrap();
        let default = temperature_scale(&raw, DEFAULT_TEMPERATURE).unwrap();
        let flat = temperature_scale(&raw, 100.0).unwrap();

        assert!(sharp[0] > 0.99);
        assert!(sharp[0] > default[0] && default[0] > flat[0]);
        assert_relative_eq!(flat[0], 1.0 / 3.0, epsilon = 0.01);
    }

    #[test]
    fn test_large_scores_do_not_overflow() {
        let out = temperature_scale(&[1000.0, 999.0], 1.0).unwrap();
        assert!(out.iter().all(|p| p.is_finite()));
        assert_relative_eq!(out[0] + out[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_invalid_temperature() {
        assert!(temperature_scale(&[0.1, 0.2], 0.0).is_err());
        assert!(temperature_scale(&[0.1, 0.2], -1.5).is_err());
        assert!(temperature_scale(&[0.1, 0.2], f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(temperature_scale(&[], 1.5).is_err());
        assert!(temperature_scale(&[0.1, f64::INFINITY], 1.5).is_err());
    }
}
