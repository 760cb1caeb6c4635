//! Sensor reading model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A validated sensor reading, as it travels through the pipeline.
///
/// Immutable once built. The id is assigned at ingest so a reading can be
/// traced from the accept response through scoring and delivery logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub features: BTreeMap<String, f64>,
}

/// Wire shape accepted by the ingestion endpoint.
///
/// The body is a flat object: an optional RFC 3339 `timestamp` plus one key
/// per feature. Keeping the feature set open-ended means producers can add
/// sensors without a schema change on this side.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl IngestRequest {
    /// Validates the payload and promotes it to a `Reading`.
    ///
    /// Rejects empty feature sets and any value that is not a finite number.
    /// A missing timestamp gets the receipt time.
    pub fn into_reading(self, received_at: DateTime<Utc>) -> Result<Reading, String> {
        if self.features.is_empty() {
            return Err("reading must carry at least one feature".to_string());
        }

        let mut features = BTreeMap::new();
        for (name, value) in self.features {
            let number = value
                .as_f64()
                .ok_or_else(|| format!("feature '{}' must be a number", name))?;
            features.insert(name.clone(), require_finite(&name, number)?);
        }

        Ok(Reading {
            id: Uuid::new_v4(),
            timestamp: self.timestamp.unwrap_or(received_at),
            features,
        })
    }
}

/// Gate applied to every feature value before it may enter the pipeline.
/// serde_json already refuses NaN and infinity on the wire; this guard covers
/// readings built in-process.
pub fn require_finite(name: &str, number: f64) -> Result<f64, String> {
    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("feature '{}' must be finite", name))
    }
}

/// Body returned for an accepted reading.
#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub status: &'static str,
    pub id: Uuid,
}
