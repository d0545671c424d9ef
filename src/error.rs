//! Error types for the intake pipeline
//!
//! Storage and notification failures are transient: the retry envelope
//! re-runs the request when they occur. Only `IntakeError::ExhaustedRetries`
//! reaches the webhook boundary.

use thiserror::Error;

/// Tabular storage collaborator errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("row range {start}..{end} out of bounds for sheet '{sheet}' with {len} rows")]
    RowRange {
        sheet: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Notification collaborator errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification gateway returned status {0}")]
    Status(u16),
}

/// Invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Request-level pipeline errors
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("notification failure: {0}")]
    Notify(#[from] NotifyError),

    #[error("request failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<IntakeError>,
    },
}

impl IntakeError {
    /// Whether the retry envelope should try the request again
    pub fn is_transient(&self) -> bool {
        !matches!(self, IntakeError::ExhaustedRetries { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::SheetNotFound("Contact".into());
        assert!(err.to_string().contains("Contact"));

        let err = StoreError::RowRange {
            sheet: "Contact".into(),
            start: 3,
            end: 5,
            len: 4,
        };
        assert!(err.to_string().contains("3..5"));

        let err = IntakeError::ExhaustedRetries {
            attempts: 3,
            source: Box::new(IntakeError::Store(StoreError::Poisoned)),
        };
        assert!(err.to_string().contains("after 3 attempts"));
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(IntakeError::Store(StoreError::Poisoned).is_transient());
        assert!(IntakeError::Notify(NotifyError::Status(502)).is_transient());

        let exhausted = IntakeError::ExhaustedRetries {
            attempts: 1,
            source: Box::new(IntakeError::Store(StoreError::Poisoned)),
        };
        assert!(!exhausted.is_transient());
    }
}
