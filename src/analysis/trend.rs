//! Submission trend over the most recent rows

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows in each comparison window
pub const TREND_WINDOW: usize = 10;

/// Percentage change beyond which the trend is no longer stable
pub const TREND_THRESHOLD_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "Increasing",
            Trend::Decreasing => "Decreasing",
            Trend::Stable => "Stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare the last 10 rows against the 10 before them
///
/// `change = (recent - previous) / previous * 100`; above 10 is Increasing,
/// below -10 is Decreasing. An empty previous window is Stable.
pub fn submission_trend(total_rows: usize) -> Trend {
    let recent = total_rows.min(TREND_WINDOW);
    let previous = total_rows.saturating_sub(TREND_WINDOW).min(TREND_WINDOW);

    if previous == 0 {
        return Trend::Stable;
    }

    let change = (recent as f64 - previous as f64) / previous as f64 * 100.0;
    if change > TREND_THRESHOLD_PCT {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD_PCT {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Per-column trends for the full analysis
///
/// Not computed yet; the analysis sheet carries no trend rows.
pub fn identify_trends(_headers: &[String], _rows_len: usize) -> Vec<(String, Trend)> {
    Vec::new()
}
