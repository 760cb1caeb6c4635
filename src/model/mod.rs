//! Anomaly classifier boundary
//!
//! The pipeline only sees the `AnomalyClassifier` trait, so the scoring
//! algorithm can be swapped without touching queueing, health, or delivery
//! code. The shipped implementation is a one-class SVM evaluated in-process
//! from an exported parameter file.

pub mod ocsvm;

pub use ocsvm::OcsvmModel;

use std::collections::BTreeMap;

/// Verdict for a single reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub is_anomaly: bool,
    /// Normalized anomaly score in [0, 1]; higher means more anomalous.
    /// None when the model cannot produce a calibrated score.
    pub probability: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("reading is missing feature '{0}'")]
    MissingFeature(String),

    #[error("feature '{0}' is not finite")]
    NonFiniteFeature(String),

    #[error("model evaluation failed: {0}")]
    Model(String),
}

/// A trained classifier the scoring worker runs every reading through.
///
/// Implementations must tolerate readings that carry more features than the
/// model knows about; unknown features are ignored. A missing expected
/// feature is an error.
pub trait AnomalyClassifier: Send + Sync {
    /// Feature names the model expects, in training order.
    fn feature_names(&self) -> &[String];

    fn score(&self, features: &BTreeMap<String, f64>) -> Result<ScoreOutcome, ScoringError>;
}
