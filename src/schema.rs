//! Header reconciliation and record projection
//!
//! Sheet columns only ever grow: unseen record keys are appended after the
//! existing headers, which are never reordered or removed.

use crate::error::StoreError;
use crate::intake::Record;
use crate::sheet::{CellValue, TabularStore};
use std::collections::HashSet;

/// Extend the sheet's header row with any keys it has not seen yet
///
/// New keys keep the order of their first appearance in `incoming_keys`,
/// and repeats within `incoming_keys` are dropped. The header row is only
/// rewritten when something new arrived. Returns the full column list.
///
/// Callers must hold the sheet's write lock: this is a read-modify-write.
pub async fn reconcile(
    store: &dyn TabularStore,
    sheet: &str,
    incoming_keys: &[String],
) -> Result<Vec<String>, StoreError> {
    let existing = store.get_headers(sheet).await?;
    let merged = merge_headers(&existing, incoming_keys);

    if merged.len() > existing.len() {
        store.set_headers(sheet, &merged).await?;
        log::info!(
            "🧩 Sheet '{}' grew from {} to {} columns: {:?}",
            sheet,
            existing.len(),
            merged.len(),
            &merged[existing.len()..]
        );
    }

    Ok(merged)
}

/// `existing` followed by every key of `incoming` not already present
pub fn merge_headers(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut merged = existing.to_vec();

    for key in incoming {
        if seen.insert(key.as_str()) {
            merged.push(key.clone());
        }
    }

    merged
}

/// Lay a record out along `columns`
///
/// Columns the record does not carry (or carries as null) become empty
/// cells. Always returns exactly `columns.len()` cells.
pub fn project(columns: &[String], record: &Record) -> Vec<CellValue> {
    columns
        .iter()
        .map(|column| {
            record
                .get(column)
                .map(CellValue::from_value)
                .unwrap_or(CellValue::Empty)
        })
        .collect()
}
