//! In-memory sheet store

use super::{check_row_range, pad_row, CellValue, HighlightRule, TabularStore};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct SheetData {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    rules: Vec<HighlightRule>,
    created_at: DateTime<Utc>,
}

impl SheetData {
    fn new() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            rules: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Process-local store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, SheetData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SheetData>>, StoreError> {
        self.sheets.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn sheet_mut<'a>(
    sheets: &'a mut HashMap<String, SheetData>,
    sheet: &str,
) -> Result<&'a mut SheetData, StoreError> {
    sheets
        .get_mut(sheet)
        .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(sheet))
    }

    async fn create_sheet(&self, sheet: &str) -> Result<(), StoreError> {
        self.lock()?
            .entry(sheet.to_string())
            .or_insert_with(SheetData::new);
        Ok(())
    }

    async fn sheet_created_at(&self, sheet: &str) -> Result<DateTime<Utc>, StoreError> {
        let mut sheets = self.lock()?;
        Ok(sheet_mut(&mut sheets, sheet)?.created_at)
    }

    async fn get_headers(&self, sheet: &str) -> Result<Vec<String>, StoreError> {
        let mut sheets = self.lock()?;
        Ok(sheet_mut(&mut sheets, sheet)?.headers.clone())
    }

    async fn set_headers(&self, sheet: &str, headers: &[String]) -> Result<(), StoreError> {
        let mut sheets = self.lock()?;
        sheet_mut(&mut sheets, sheet)?.headers = headers.to_vec();
        Ok(())
    }

    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let mut sheets = self.lock()?;
        let data = sheet_mut(&mut sheets, sheet)?;
        let width = data.headers.len();
        Ok(data
            .rows
            .iter()
            .map(|row| pad_row(row.clone(), width))
            .collect())
    }

    async fn append_row(&self, sheet: &str, row: &[CellValue]) -> Result<usize, StoreError> {
        let mut sheets = self.lock()?;
        let data = sheet_mut(&mut sheets, sheet)?;
        data.rows.push(row.to_vec());
        Ok(data.rows.len() - 1)
    }

    async fn delete_rows(
        &self,
        sheet: &str,
        start: usize,
        count: usize,
    ) -> Result<(), StoreError> {
        let mut sheets = self.lock()?;
        let data = sheet_mut(&mut sheets, sheet)?;
        check_row_range(sheet, start, count, data.rows.len())?;

        data.rows.drain(start..start + count);
        data.rules.retain(|rule| rule.row < start || rule.row >= start + count);
        for rule in data.rules.iter_mut().filter(|rule| rule.row >= start + count) {
            rule.row -= count;
        }
        Ok(())
    }

    async fn clear_sheet(&self, sheet: &str) -> Result<(), StoreError> {
        let mut sheets = self.lock()?;
        let data = sheet_mut(&mut sheets, sheet)?;
        data.headers.clear();
        data.rows.clear();
        data.rules.clear();
        Ok(())
    }

    async fn add_highlight_rule(
        &self,
        sheet: &str,
        rule: HighlightRule,
    ) -> Result<(), StoreError> {
        let mut sheets = self.lock()?;
        sheet_mut(&mut sheets, sheet)?.rules.push(rule);
        Ok(())
    }

    async fn highlight_rules(&self, sheet: &str) -> Result<Vec<HighlightRule>, StoreError> {
        let mut sheets = self.lock()?;
        Ok(sheet_mut(&mut sheets, sheet)?.rules.clone())
    }

    fn sheet_url(&self, sheet: &str) -> String {
        format!("memory://{}", sheet)
    }

    fn backend_type(&self) -> &'static str {
        "Memory"
    }
}
