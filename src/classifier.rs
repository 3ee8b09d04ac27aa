//! Classifier Artifact
//!
//! The crop classifier is trained offline and exported to JSON. It is loaded
//! once at startup and shared read-only between request handlers.
//!
//! Supported exports:
//! - `logistic_regression`: multinomial linear model with optional standard scaler
//! - `gaussian_nb`: Gaussian naive Bayes (per-class mean/variance)
//!
//! Both produce a probability-like score per crop, aligned with `CROP_NAMES`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use crate::crops::{CROP_COUNT, CROP_NAMES};
use crate::features::{SoilClimateInput, FEATURE_NAMES};

const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Anything that maps an input vector to one raw score per crop
pub trait Classifier: Send + Sync {
    /// Raw scores, one per entry of `CROP_NAMES`, in the same order
    fn predict_distribution(&self, input: &SoilClimateInput) -> Result<Vec<f64>>;
}

/// Serialized classifier as written by the training pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub classes: Vec<String>,
    pub feature_names: Vec<String>,
    #[serde(flatten)]
    pub model: ModelKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression(LogisticModel),
    GaussianNb(GaussianNbModel),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    /// One row of feature weights per class
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GaussianNbModel {
    pub class_prior: Vec<f64>,
    /// Per-class feature means
    pub theta: Vec<Vec<f64>>,
    /// Per-class feature variances
    pub var: Vec<Vec<f64>>,
}

impl ModelArtifact {
    /// Load and validate the artifact at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {:?}", path))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid model artifact: {:?}", path))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(contents).context("Failed to parse model artifact JSON")?;
        artifact.check_shape()?;
        Ok(artifact)
    }

    /// Classes must match the label set positionally, features the input order
    fn check_shape(&self) -> Result<()> {
        if self.classes.len() != CROP_COUNT
            || self.classes.iter().zip(CROP_NAMES).any(|(a, b)| a != b)
        {
            anyhow::bail!(
                "Model classes {:?} do not match the crop label set",
                self.classes
            );
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            anyhow::bail!(
                "Model features {:?} do not match expected {:?}",
                self.feature_names,
                FEATURE_NAMES
            );
        }

        match &self.model {
            ModelKind::LogisticRegression(m) => {
                check_matrix("coefficients", &m.coefficients)?;
                check_len("intercepts", m.intercepts.len(), CROP_COUNT)?;
                if let Some(scaler) = &m.scaler {
                    check_len("scaler.mean", scaler.mean.len(), FEATURE_COUNT)?;
                    check_len("scaler.scale", scaler.scale.len(), FEATURE_COUNT)?;
                    if scaler.scale.iter().any(|s| !(*s > 0.0)) {
                        anyhow::bail!("scaler.scale must be strictly positive");
                    }
                }
            }
            ModelKind::GaussianNb(m) => {
                check_len("class_prior", m.class_prior.len(), CROP_COUNT)?;
                check_matrix("theta", &m.theta)?;
                check_matrix("var", &m.var)?;
                if m.var.iter().flatten().any(|v| !(*v > 0.0)) {
                    anyhow::bail!("var must be strictly positive");
                }
                if m.class_prior.iter().any(|p| !(*p > 0.0)) {
                    anyhow::bail!("class_prior must be strictly positive");
                }
            }
        }
        Ok(())
    }
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        anyhow::bail!("{} has {} entries, expected {}", name, actual, expected);
    }
    Ok(())
}

fn check_matrix(name: &str, rows: &[Vec<f64>]) -> Result<()> {
    check_len(name, rows.len(), CROP_COUNT)?;
    for (i, row) in rows.iter().enumerate() {
        check_len(&format!("{}[{}]", name, i), row.len(), FEATURE_COUNT)?;
    }
    Ok(())
}

/// Normalize log-scores into probabilities
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl LogisticModel {
    fn predict_proba(&self, x: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let x: Vec<f64> = match &self.scaler {
            Some(s) => x
                .iter()
                .zip(s.mean.iter().zip(&s.scale))
                .map(|(v, (m, sc))| (v - m) / sc)
                .collect(),
            None => x.to_vec(),
        };

        let scores: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| w.iter().zip(&x).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
            .collect();

        softmax(&scores)
    }
}

impl GaussianNbModel {
    fn predict_proba(&self, x: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let joint: Vec<f64> = self
            .class_prior
            .iter()
            .zip(self.theta.iter().zip(&self.var))
            .map(|(prior, (means, vars))| {
                let log_likelihood: f64 = x
                    .iter()
                    .zip(means.iter().zip(vars))
                    .map(|(xi, (mu, var))| -0.5 * (2.0 * PI * var).ln() - (xi - mu).powi(2) / (2.0 * var))
                    .sum();
                prior.ln() + log_likelihood
            })
            .collect();

        softmax(&joint)
    }
}

impl Classifier for ModelArtifact {
    fn predict_distribution(&self, input: &SoilClimateInput) -> Result<Vec<f64>> {
        let x = input.as_array();
        let scores = match &self.model {
            ModelKind::LogisticRegression(m) => m.predict_proba(&x),
            ModelKind::GaussianNb(m) => m.predict_proba(&x),
        };

        if scores.len() != CROP_COUNT {
            anyhow::bail!("Classifier returned {} scores, expected {}", scores.len(), CROP_COUNT);
        }
        if scores.iter().any(|s| !s.is_finite()) {
            anyhow::bail!("Classifier returned non-finite scores for input {:?}", x);
        }
        Ok(scores)
    }
}
