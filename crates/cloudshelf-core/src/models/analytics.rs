use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Usage metrics reported by the backend.
///
/// The set of metrics is owned by the backend, so they are kept as an open
/// map with typed accessors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageAnalytics {
    pub metrics: Map<String, Value>,
}

impl UsageAnalytics {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name)
    }

    /// Numeric metric, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(Value::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.metrics.iter()
    }
}

/// Acknowledgement body for mutating calls (delete, share, rollback).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl Ack {
    /// Human-readable acknowledgement, if the backend sent one.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.detail.as_deref())
    }
}
