//! One-class SVM evaluation
//!
//! Runs the decision function of a pre-trained one-class SVM directly from
//! its exported parameters. Only evaluation lives here; training and model
//! selection happen offline and ship their result as a JSON file.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Deserialize;

use super::{AnomalyClassifier, ScoreOutcome, ScoringError};

/// Fallback when the exported temperature is unusable.
pub const DEFAULT_SCORE_TEMPERATURE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Rbf,
    Linear,
}

/// Parameter export produced by the offline training pipeline.
#[derive(Debug, Deserialize)]
pub struct OcsvmParams {
    pub feature_names: Vec<String>,
    pub kernel: Kernel,
    /// Required for the RBF kernel, ignored for linear.
    pub gamma: Option<f64>,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coefs: Vec<f64>,
    pub intercept: f64,
    /// Temperature for the sigmoid score normalization.
    #[serde(default = "default_temperature")]
    pub score_temperature: f64,
}

fn default_temperature() -> f64 {
    DEFAULT_SCORE_TEMPERATURE
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model parameters: {0}")]
    Invalid(String),
}

pub struct OcsvmModel {
    feature_names: Vec<String>,
    kernel: Kernel,
    gamma: f64,
    support_vectors: Array2<f64>,
    dual_coefs: Array1<f64>,
    intercept: f64,
    temperature: f64,
}

impl OcsvmModel {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let params: OcsvmParams = serde_json::from_str(&raw)?;
        Self::from_params(params)
    }

    pub fn from_params(params: OcsvmParams) -> Result<Self, ModelLoadError> {
        let dims = params.feature_names.len();
        if dims == 0 {
            return Err(ModelLoadError::Invalid(
                "feature_names must not be empty".to_string(),
            ));
        }
        if params.support_vectors.is_empty() {
            return Err(ModelLoadError::Invalid(
                "support_vectors must not be empty".to_string(),
            ));
        }
        if params.dual_coefs.len() != params.support_vectors.len() {
            return Err(ModelLoadError::Invalid(format!(
                "{} dual coefficients for {} support vectors",
                params.dual_coefs.len(),
                params.support_vectors.len()
            )));
        }
        if !params.intercept.is_finite() {
            return Err(ModelLoadError::Invalid(
                "intercept is not finite".to_string(),
            ));
        }
        if params.dual_coefs.iter().any(|c| !c.is_finite()) {
            return Err(ModelLoadError::Invalid(
                "dual_coefs contain a non-finite value".to_string(),
            ));
        }

        let rows = params.support_vectors.len();
        let mut flat = Vec::with_capacity(rows * dims);
        for (i, row) in params.support_vectors.iter().enumerate() {
            if row.len() != dims {
                return Err(ModelLoadError::Invalid(format!(
                    "support vector {} has {} values, expected {}",
                    i,
                    row.len(),
                    dims
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(ModelLoadError::Invalid(format!(
                    "support vector {} contains a non-finite value",
                    i
                )));
            }
            flat.extend_from_slice(row);
        }
        let support_vectors = Array2::from_shape_vec((rows, dims), flat)
            .map_err(|e| ModelLoadError::Invalid(e.to_string()))?;

        let gamma = match params.kernel {
            Kernel::Rbf => match params.gamma {
                Some(g) if g.is_finite() && g > 0.0 => g,
                _ => {
                    return Err(ModelLoadError::Invalid(
                        "rbf kernel requires gamma > 0".to_string(),
                    ))
                }
            },
            Kernel::Linear => 0.0,
        };

        // A non-positive temperature would flip or degenerate the sigmoid.
        // The exporter has shipped that once; recover instead of refusing.
        let temperature = if params.score_temperature.is_finite()
            && params.score_temperature > 0.0
        {
            params.score_temperature
        } else {
            tracing::warn!(
                configured = params.score_temperature,
                fallback = DEFAULT_SCORE_TEMPERATURE,
                "Invalid score temperature in model export, using fallback"
            );
            DEFAULT_SCORE_TEMPERATURE
        };

        Ok(Self {
            feature_names: params.feature_names,
            kernel: params.kernel,
            gamma,
            support_vectors,
            dual_coefs: Array1::from(params.dual_coefs),
            intercept: params.intercept,
            temperature,
        })
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.nrows()
    }

    /// Signed distance to the learned boundary, sklearn sign convention:
    /// negative means outside the training distribution.
    fn decision(&self, x: &Array1<f64>) -> f64 {
        match self.kernel {
            Kernel::Rbf => {
                let mut sum = 0.0;
                for (sv, coef) in self
                    .support_vectors
                    .outer_iter()
                    .zip(self.dual_coefs.iter())
                {
                    let diff = &sv - x;
                    sum += coef * (-self.gamma * diff.dot(&diff)).exp();
                }
                sum + self.intercept
            }
            Kernel::Linear => self.dual_coefs.dot(&self.support_vectors.dot(x)) + self.intercept,
        }
    }

    /// Squashes the decision value into [0, 1] so that outliers
    /// (decision < 0) land above 0.5 and deep inliers approach 0.
    fn normalize(&self, decision: f64) -> f64 {
        1.0 / (1.0 + (decision / self.temperature).exp())
    }
}

impl AnomalyClassifier for OcsvmModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn score(&self, features: &BTreeMap<String, f64>) -> Result<ScoreOutcome, ScoringError> {
        let mut x = Array1::zeros(self.feature_names.len());
        for (i, name) in self.feature_names.iter().enumerate() {
            let value = *features
                .get(name)
                .ok_or_else(|| ScoringError::MissingFeature(name.clone()))?;
            if !value.is_finite() {
                return Err(ScoringError::NonFiniteFeature(name.clone()));
            }
            x[i] = value;
        }

        let decision = self.decision(&x);
        if !decision.is_finite() {
            return Err(ScoringError::Model(format!(
                "decision value is not finite ({})",
                decision
            )));
        }

        Ok(ScoreOutcome {
            is_anomaly: decision < 0.0,
            probability: Some(self.normalize(decision)),
        })
    }
}
