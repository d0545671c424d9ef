//! formflow - webhook form intake and analysis
//!
//! Submissions arrive over HTTP, get flattened into records, and are
//! appended to a tabular sheet whose columns grow as new fields appear.
//! Each submission refreshes a companion analysis sheet, may trigger a
//! notification, and prunes rows past the retention period.

pub mod analysis;
pub mod config;
pub mod error;
pub mod intake;
pub mod notify;
pub mod pipeline;
pub mod retention;
pub mod retry;
pub mod schema;
pub mod server;
pub mod sheet;
pub mod writer;

pub use config::PipelineConfig;
pub use error::{ConfigError, IntakeError, NotifyError, StoreError};
pub use pipeline::{IntakePipeline, SubmissionOutcome};
