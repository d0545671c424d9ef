//! Pipeline configuration from environment variables
//!
//! Loaded once at startup and passed into the pipeline constructor.

use crate::error::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Appended to form names that would otherwise look like analysis sheets
pub const RESERVED_NAME_ESCAPE: &str = "_Form";

/// Configuration for the intake pipeline and webhook server
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Send a notification for each processed submission
    pub email_notification: bool,

    /// Recipient handed to the notifier
    pub email_address: String,

    /// Total attempts per request (first try included)
    pub max_retries: u32,

    /// Fixed pause between attempts in milliseconds
    pub retry_delay_ms: u64,

    /// Rows older than this many days are pruned
    pub data_retention_days: u32,

    /// Standard deviations from the mean before a value counts as an anomaly
    pub anomaly_threshold: f64,

    /// Only notify for High priority or anomalous submissions
    pub notify_flagged_only: bool,

    /// Sheet name used when a submission carries no `form_name`
    pub default_form_name: String,

    /// Suffix appended to a sheet name to name its analysis sheet
    pub analysis_suffix: String,

    /// Path to SQLite database file (None keeps sheets in memory)
    pub db_path: Option<String>,

    /// Address the webhook server binds to
    pub bind_addr: String,

    /// Mail gateway endpoint (None logs notifications instead)
    pub notify_webhook_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            email_notification: true,
            email_address: String::new(),
            max_retries: 3,
            retry_delay_ms: 1_000,
            data_retention_days: 365,
            anomaly_threshold: 2.0,
            notify_flagged_only: false,
            default_form_name: "Default_Form".to_string(),
            analysis_suffix: "_Analysis".to_string(),
            db_path: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            notify_webhook_url: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FORMFLOW_EMAIL_NOTIFICATION` (default: true)
    /// - `FORMFLOW_EMAIL_ADDRESS` (default: empty)
    /// - `FORMFLOW_MAX_RETRIES` (default: 3)
    /// - `FORMFLOW_RETRY_DELAY_MS` (default: 1000)
    /// - `FORMFLOW_DATA_RETENTION_DAYS` (default: 365)
    /// - `FORMFLOW_ANOMALY_THRESHOLD` (default: 2)
    /// - `FORMFLOW_NOTIFY_FLAGGED_ONLY` (default: false)
    /// - `FORMFLOW_DEFAULT_FORM_NAME` (default: Default_Form)
    /// - `FORMFLOW_ANALYSIS_SUFFIX` (default: _Analysis)
    /// - `FORMFLOW_DB_PATH` (default: unset, in-memory sheets)
    /// - `FORMFLOW_BIND_ADDR` (default: 0.0.0.0:8080)
    /// - `FORMFLOW_NOTIFY_WEBHOOK_URL` (default: unset, log notifier)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            email_notification: parse_or(
                &lookup,
                "FORMFLOW_EMAIL_NOTIFICATION",
                defaults.email_notification,
            ),

            email_address: text("FORMFLOW_EMAIL_ADDRESS").unwrap_or(defaults.email_address),

            max_retries: parse_or(&lookup, "FORMFLOW_MAX_RETRIES", defaults.max_retries),

            retry_delay_ms: parse_or(&lookup, "FORMFLOW_RETRY_DELAY_MS", defaults.retry_delay_ms),

            data_retention_days: parse_or(
                &lookup,
                "FORMFLOW_DATA_RETENTION_DAYS",
                defaults.data_retention_days,
            ),

            anomaly_threshold: parse_or(
                &lookup,
                "FORMFLOW_ANOMALY_THRESHOLD",
                defaults.anomaly_threshold,
            ),

            notify_flagged_only: parse_or(
                &lookup,
                "FORMFLOW_NOTIFY_FLAGGED_ONLY",
                defaults.notify_flagged_only,
            ),

            default_form_name: text("FORMFLOW_DEFAULT_FORM_NAME")
                .unwrap_or(defaults.default_form_name),

            analysis_suffix: text("FORMFLOW_ANALYSIS_SUFFIX").unwrap_or(defaults.analysis_suffix),

            db_path: text("FORMFLOW_DB_PATH"),

            bind_addr: text("FORMFLOW_BIND_ADDR").unwrap_or(defaults.bind_addr),

            notify_webhook_url: text("FORMFLOW_NOTIFY_WEBHOOK_URL"),
        }
    }

    /// Reject values outside their documented bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "anomaly_threshold",
                message: format!("must be a positive number, got {}", self.anomaly_threshold),
            });
        }
        if self.analysis_suffix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "analysis_suffix",
                message: "must not be empty".to_string(),
            });
        }
        if self.default_form_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_form_name",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Name of the analysis sheet paired with `sheet`
    pub fn analysis_sheet_name(&self, sheet: &str) -> String {
        format!("{}{}", sheet, self.analysis_suffix)
    }

    /// Primary sheet for a form name, never colliding with an analysis sheet
    ///
    /// Names ending in the analysis suffix, optionally followed by any number
    /// of `_Form`, get one more `_Form` appended. The mapping is one-to-one,
    /// and no primary sheet name ends in the analysis suffix.
    pub fn primary_sheet_name(&self, form_name: &str) -> String {
        if self.analysis_suffix.is_empty() {
            return form_name.to_string();
        }

        let mut stem = form_name;
        while let Some(shorter) = stem.strip_suffix(RESERVED_NAME_ESCAPE) {
            stem = shorter;
        }

        if stem.ends_with(&self.analysis_suffix) {
            let escaped = format!("{}{}", form_name, RESERVED_NAME_ESCAPE);
            log::warn!(
                "⚠️  Form name '{}' ends with the analysis suffix, writing to '{}'",
                form_name,
                escaped
            );
            escaped
        } else {
            form_name.to_string()
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
