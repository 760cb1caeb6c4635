//! Scored result model

use serde::{Deserialize, Serialize};

use crate::models::reading::Reading;

pub const DETAILS_ANOMALY: &str = "Anomaly detected";
pub const DETAILS_NORMAL: &str = "Normal behavior";

/// Outcome of scoring one reading. Built only by the scoring worker, then
/// handed to the forwarder as-is. The reading flattens into the payload so
/// the downstream consumer sees one flat object per result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub reading: Reading,
    pub is_anomaly: bool,
    /// Normalized anomaly score in [0, 1]. None when the model cannot
    /// produce a calibrated score.
    pub anomaly_probability: Option<f64>,
    pub details: String,
    /// Wall time the classifier took for this reading, in milliseconds.
    pub processing_ms: f64,
}

impl ScoredResult {
    pub fn new(
        reading: Reading,
        is_anomaly: bool,
        anomaly_probability: Option<f64>,
        processing_ms: f64,
    ) -> Self {
        let details = if is_anomaly {
            DETAILS_ANOMALY
        } else {
            DETAILS_NORMAL
        };
        Self {
            reading,
            is_anomaly,
            anomaly_probability,
            details: details.to_string(),
            processing_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn reading() -> Reading {
        let mut features = BTreeMap::new();
        features.insert("temperature".to_string(), 21.5);
        Reading {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            features,
        }
    }

    #[test]
    fn test_details_follow_verdict() {
        let anomalous = ScoredResult::new(reading(), true, Some(0.93), 1.2);
        assert_eq!(anomalous.details, DETAILS_ANOMALY);

        let normal = ScoredResult::new(reading(), false, Some(0.08), 0.9);
        assert_eq!(normal.details, DETAILS_NORMAL);
    }

    #[test]
    fn test_serializes_flat() {
        let result = ScoredResult::new(reading(), true, Some(0.93), 1.2);
        let value = serde_json::to_value(&result).unwrap();

        // Reading fields sit at the top level next to the verdict.
        assert!(value.get("id").is_some());
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["features"]["temperature"], 21.5);
        assert_eq!(value["is_anomaly"], true);
        assert_eq!(value["details"], DETAILS_ANOMALY);
        assert!(value.get("reading").is_none());
    }
}
