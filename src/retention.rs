//! Retention pruning
//!
//! Rows whose timestamp is older than `now - retention_days` are deleted.
//! The timestamp column is the first header containing "timestamp"
//! (case-insensitive); sheets without one are left alone.

use crate::error::StoreError;
use crate::sheet::{CellValue, TabularStore};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Position of the first header containing "timestamp", ignoring case
pub fn timestamp_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.to_lowercase().contains("timestamp"))
}

/// Parse a timestamp cell; unparseable cells yield None
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD`. Offset-less forms are read as UTC.
pub fn parse_timestamp(cell: &CellValue) -> Option<DateTime<Utc>> {
    let text = cell.as_text()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Indexes of rows whose timestamp precedes `cutoff`, ascending
pub fn stale_rows(rows: &[Vec<CellValue>], column: usize, cutoff: DateTime<Utc>) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let ts = row.get(column).and_then(parse_timestamp)?;
            (ts < cutoff).then_some(index)
        })
        .collect()
}

/// Group ascending indexes into `(start, count)` runs of consecutive rows
pub fn contiguous_runs(indexes: &[usize]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &index in indexes {
        match runs.last_mut() {
            Some((start, count)) if *start + *count == index => *count += 1,
            _ => runs.push((index, 1)),
        }
    }
    runs
}

/// Delete every row older than the retention period
///
/// Stale rows need not be contiguous; runs are deleted from the bottom of
/// the sheet upwards so earlier indexes stay valid. Returns the number of
/// rows removed.
pub async fn prune(
    store: &dyn TabularStore,
    sheet: &str,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let headers = store.get_headers(sheet).await?;
    let Some(column) = timestamp_column(&headers) else {
        log::debug!("No timestamp column in '{}', skipping retention", sheet);
        return Ok(0);
    };

    // a period reaching past the earliest representable date keeps everything
    let Some(cutoff) = Duration::try_days(i64::from(retention_days))
        .and_then(|period| now.checked_sub_signed(period))
    else {
        log::debug!(
            "Retention of {} days predates every timestamp, skipping '{}'",
            retention_days,
            sheet
        );
        return Ok(0);
    };
    let rows = store.get_all_rows(sheet).await?;
    let stale = stale_rows(&rows, column, cutoff);
    if stale.is_empty() {
        return Ok(0);
    }

    for (start, count) in contiguous_runs(&stale).into_iter().rev() {
        store.delete_rows(sheet, start, count).await?;
    }

    log::info!(
        "🧹 Pruned {} rows older than {} from '{}'",
        stale.len(),
        cutoff.format("%Y-%m-%d"),
        sheet
    );
    Ok(stale.len())
}
