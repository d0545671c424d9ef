//! Analysis - statistics recomputed from a sheet's rows after every write
//!
//! ```text
//! sheet rows → numeric_columns → averages / anomalies     → AnalysisSnapshot → <sheet>_Analysis
//!                              → quick_anomalies + trend → QuickAnalysis    → notification
//! ```

pub mod snapshot;
pub mod stats;
pub mod trend;

pub use snapshot::{read_sheet, write_analysis_sheet, AnalysisSnapshot, QuickAnalysis};
pub use stats::{ColumnStats, NumericColumn};
pub use trend::Trend;
