//! Submission classification
//!
//! The pipeline only depends on the `Classifier` trait. `DefaultClassifier`
//! labels every submission General / Neutral / Medium.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Priority labels recognised by the record writer's highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Exact, case-sensitive match against a priority label
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels attached to a record and serialized into `processed_data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub sentiment: String,
    pub priority: Priority,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            category: "General".to_string(),
            sentiment: "Neutral".to_string(),
            priority: Priority::Medium,
        }
    }
}

/// Strategy for labelling flattened submissions
///
/// Implementations must not fail: when no rule applies they return
/// `Classification::default()`.
pub trait Classifier: Send + Sync {
    fn classify(&self, fields: &Map<String, Value>) -> Classification;

    /// Get classifier name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl Classifier for DefaultClassifier {
    fn classify(&self, _fields: &Map<String, Value>) -> Classification {
        Classification::default()
    }

    fn name(&self) -> &'static str {
        "default"
    }
}
