//! Record construction from raw submissions

use super::classifier::{Classification, Classifier};
use super::flatten::flatten;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Raw nested submission as received from the webhook
pub type Submission = Map<String, Value>;

pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const PROCESSED_DATA_FIELD: &str = "processed_data";
pub const FORM_NAME_FIELD: &str = "form_name";

/// Flattened, classified representation of one submission
///
/// Built once per request; the retry envelope reuses it so every attempt
/// writes the same timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
    classification: Classification,
    received_at: DateTime<Utc>,
}

impl Record {
    /// Flatten, stamp and classify a submission
    ///
    /// Adds `timestamp` (RFC 3339, milliseconds, UTC) and `processed_data`
    /// (the classification as compact JSON). A submitted `timestamp` field is
    /// overwritten in place.
    pub fn from_submission(
        submission: &Submission,
        classifier: &dyn Classifier,
        received_at: DateTime<Utc>,
    ) -> Self {
        let mut fields = flatten(submission);
        fields.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(received_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let classification = classifier.classify(&fields);
        let processed = json!({
            "category": classification.category,
            "sentiment": classification.sentiment,
            "priority": classification.priority.as_str(),
        });
        fields.insert(
            PROCESSED_DATA_FIELD.to_string(),
            Value::String(processed.to_string()),
        );

        log::debug!(
            "Built record with {} fields (classifier: {}, priority: {})",
            fields.len(),
            classifier.name(),
            classification.priority
        );

        Self {
            fields,
            classification,
            received_at,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Keys in first-appearance order
    pub fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn timestamp(&self) -> &str {
        self.fields
            .get(TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Declared form identity, if the submission carried a non-empty one
    pub fn form_name(&self) -> Option<&str> {
        self.fields
            .get(FORM_NAME_FIELD)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Target sheet name for this record
    pub fn sheet_name<'a>(&'a self, default_form_name: &'a str) -> &'a str {
        self.form_name().unwrap_or(default_form_name)
    }
}
