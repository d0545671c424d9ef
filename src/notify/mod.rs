//! Submission notifications
//!
//! A `Notifier` delivers a rendered subject/body pair to a recipient.
//! Two backends ship with the crate:
//! - `LogNotifier` writes the message through the `log` facade
//! - `WebhookNotifier` relays it to an HTTP mail gateway

pub mod log_notifier;
pub mod webhook;

use crate::analysis::QuickAnalysis;
use crate::error::NotifyError;
use crate::intake::{Priority, Record};
use async_trait::async_trait;
use std::fmt::Write as _;

pub use log_notifier::LogNotifier;
pub use webhook::WebhookNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), NotifyError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Rendered notification message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn render(record: &Record, analysis: &QuickAnalysis, sheet_url: &str) -> Self {
        let classification = record.classification();
        let subject = format!(
            "New {} Priority Submission: {}",
            classification.priority,
            record.form_name().unwrap_or("Form")
        );

        let mut body = String::new();
        body.push_str("A new submission has been received and recorded.\n\n");
        let _ = writeln!(body, "Form Name: {}", record.form_name().unwrap_or("N/A"));
        let _ = writeln!(body, "Submission Time: {}", record.timestamp());
        let _ = writeln!(body, "Priority: {}", classification.priority);
        let _ = writeln!(body, "Category: {}", classification.category);
        let _ = writeln!(body, "Sentiment: {}", classification.sentiment);
        body.push_str("\nQuick Analysis:\n");
        let _ = writeln!(body, "- Total Submissions: {}", analysis.total_submissions);
        let _ = writeln!(body, "- Submission Trend: {}", analysis.submission_trend);
        if analysis.has_anomalies() {
            let _ = writeln!(
                body,
                "- Anomalies Detected: {}",
                analysis.anomalies.join(", ")
            );
        }
        let _ = writeln!(body, "\nSheet URL: {}", sheet_url);
        body.push_str(
            "\nThis is an automated notification. Please review the submission and take appropriate action.\n",
        );

        Self { subject, body }
    }
}

/// Whether a processed submission should trigger a notification
///
/// With `flagged_only`, only High priority or anomalous submissions qualify.
pub fn should_notify(
    enabled: bool,
    flagged_only: bool,
    record: &Record,
    analysis: &QuickAnalysis,
) -> bool {
    if !enabled {
        return false;
    }
    if !flagged_only {
        return true;
    }
    record.classification().priority == Priority::High || analysis.has_anomalies()
}
