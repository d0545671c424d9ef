//! Intake - turns raw webhook submissions into classified records
//!
//! ```text
//! Submission (nested) → flatten → + timestamp → Classifier → Record
//! ```

pub mod classifier;
pub mod flatten;
pub mod record;

pub use classifier::{Classification, Classifier, DefaultClassifier, Priority};
pub use flatten::flatten;
pub use record::{Record, Submission};
