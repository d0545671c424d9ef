//! Sheet storage - the tabular store records are written to
//!
//! A sheet is a named header row plus an append-only sequence of rows.
//! Row indexes are 0-based over data rows; the header is not a row.
//!
//! Backends:
//! - `MemoryStore` - process-local, used by tests and ephemeral deployments
//! - `SqliteStore` - persistent, one database file holding every sheet

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Background applied to cells whose highlight rule fires
pub const HIGHLIGHT_BACKGROUND: &str = "#f4cccc";

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Render a record value into a cell
    ///
    /// Arrays and objects are stored as compact JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Text(b.to_string()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Numeric reading of the cell
    ///
    /// Text counts when its trimmed content parses as a finite number.
    /// Empty cells are never numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => n.is_finite().then_some(*n),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Conditional highlight on one cell: fires when the cell text equals `equals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub row: usize,
    pub column: usize,
    pub equals: String,
    pub background: String,
}

impl HighlightRule {
    pub fn fires(&self, cell: &CellValue) -> bool {
        cell.as_text() == Some(self.equals.as_str())
    }
}

/// Tabular storage backend
///
/// Every operation except `sheet_exists` and `create_sheet` fails with
/// `StoreError::SheetNotFound` for an unknown sheet.
#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool, StoreError>;

    /// Create an empty sheet; a no-op when it already exists
    async fn create_sheet(&self, sheet: &str) -> Result<(), StoreError>;

    async fn sheet_created_at(&self, sheet: &str) -> Result<DateTime<Utc>, StoreError>;

    async fn get_headers(&self, sheet: &str) -> Result<Vec<String>, StoreError>;

    /// Replace the header row
    async fn set_headers(&self, sheet: &str, headers: &[String]) -> Result<(), StoreError>;

    /// All data rows in order, each padded with `Empty` to the header length
    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, StoreError>;

    /// Append a row at the end and return its index
    async fn append_row(&self, sheet: &str, row: &[CellValue]) -> Result<usize, StoreError>;

    /// Delete `count` rows starting at `start`
    ///
    /// Highlight rules inside the range are dropped and later rules shift up.
    async fn delete_rows(&self, sheet: &str, start: usize, count: usize)
        -> Result<(), StoreError>;

    /// Remove header, rows and highlight rules, keeping the sheet itself
    async fn clear_sheet(&self, sheet: &str) -> Result<(), StoreError>;

    /// Add a rule; existing rules are kept
    async fn add_highlight_rule(&self, sheet: &str, rule: HighlightRule)
        -> Result<(), StoreError>;

    async fn highlight_rules(&self, sheet: &str) -> Result<Vec<HighlightRule>, StoreError>;

    /// Reference URL for a sheet, used in notifications
    fn sheet_url(&self, sheet: &str) -> String;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Create `sheet` if it does not exist yet
///
/// Returns true when the sheet was created.
pub async fn get_or_create_sheet(store: &dyn TabularStore, sheet: &str) -> Result<bool, StoreError> {
    if store.sheet_exists(sheet).await? {
        return Ok(false);
    }

    store.create_sheet(sheet).await?;
    log::info!("📄 Created sheet '{}' ({})", sheet, store.backend_type());
    Ok(true)
}

fn check_row_range(sheet: &str, start: usize, count: usize, len: usize) -> Result<(), StoreError> {
    let end = start.saturating_add(count);
    if end > len {
        return Err(StoreError::RowRange {
            sheet: sheet.to_string(),
            start,
            end,
            len,
        });
    }
    Ok(())
}

fn pad_row(mut row: Vec<CellValue>, width: usize) -> Vec<CellValue> {
    if row.len() < width {
        row.resize(width, CellValue::Empty);
    }
    row
}
