//! Analysis snapshots
//!
//! `AnalysisSnapshot` is the full analysis written to the companion
//! analysis sheet; `QuickAnalysis` is the short summary used in
//! notifications. Both are recomputed from the primary sheet on every
//! submission and never read back.

use super::stats::{anomalies, averages, numeric_columns, quick_anomalies};
use super::trend::{identify_trends, submission_trend, Trend};
use crate::error::StoreError;
use crate::sheet::{get_or_create_sheet, CellValue, TabularStore};

pub const ANALYSIS_HEADERS: [&str; 2] = ["Metric", "Value"];

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSnapshot {
    pub total_submissions: usize,
    pub averages: Vec<(String, f64)>,
    pub trends: Vec<(String, Trend)>,
    pub anomalies: Vec<(String, Vec<f64>)>,
}

impl AnalysisSnapshot {
    pub fn compute(headers: &[String], rows: &[Vec<CellValue>], threshold: f64) -> Self {
        let numeric = numeric_columns(headers, rows);

        Self {
            total_submissions: rows.len(),
            averages: averages(&numeric),
            trends: identify_trends(headers, rows.len()),
            anomalies: anomalies(&numeric, threshold),
        }
    }

    /// Metric/Value rows, one per anomalous value
    pub fn to_rows(&self) -> Vec<[CellValue; 2]> {
        let mut rows = vec![[
            CellValue::from("Total Submissions"),
            CellValue::Number(self.total_submissions as f64),
        ]];

        rows.extend(self.averages.iter().map(|(header, mean)| {
            [
                CellValue::from(format!("Average {}", header)),
                CellValue::Number(*mean),
            ]
        }));

        rows.extend(self.trends.iter().map(|(key, trend)| {
            [
                CellValue::from(format!("Trend: {}", key)),
                CellValue::from(trend.as_str()),
            ]
        }));

        for (header, values) in &self.anomalies {
            rows.extend(values.iter().enumerate().map(|(i, value)| {
                [
                    CellValue::from(format!("Anomaly in {} #{}", header, i + 1)),
                    CellValue::Number(*value),
                ]
            }));
        }

        rows
    }
}

/// Summary attached to notifications
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAnalysis {
    pub total_submissions: usize,
    pub submission_trend: Trend,
    pub anomalies: Vec<String>,
}

impl QuickAnalysis {
    pub fn compute(headers: &[String], rows: &[Vec<CellValue>], threshold: f64) -> Self {
        let numeric = numeric_columns(headers, rows);

        Self {
            total_submissions: rows.len(),
            submission_trend: submission_trend(rows.len()),
            anomalies: quick_anomalies(&numeric, threshold),
        }
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Header row and data rows of a sheet
pub async fn read_sheet(
    store: &dyn TabularStore,
    sheet: &str,
) -> Result<(Vec<String>, Vec<Vec<CellValue>>), StoreError> {
    let headers = store.get_headers(sheet).await?;
    let rows = store.get_all_rows(sheet).await?;
    Ok((headers, rows))
}

/// Replace the contents of `analysis_sheet` with `snapshot`
///
/// Creates the sheet on first use; previous contents are cleared, never merged.
pub async fn write_analysis_sheet(
    store: &dyn TabularStore,
    analysis_sheet: &str,
    snapshot: &AnalysisSnapshot,
) -> Result<(), StoreError> {
    get_or_create_sheet(store, analysis_sheet).await?;
    store.clear_sheet(analysis_sheet).await?;

    let headers: Vec<String> = ANALYSIS_HEADERS.iter().map(|h| h.to_string()).collect();
    store.set_headers(analysis_sheet, &headers).await?;

    let rows = snapshot.to_rows();
    for row in &rows {
        store.append_row(analysis_sheet, row).await?;
    }

    log::debug!(
        "📊 Rewrote '{}' with {} metric rows",
        analysis_sheet,
        rows.len()
    );
    Ok(())
}
