//! Record writer - appends projected records to a sheet

use crate::error::StoreError;
use crate::intake::{Priority, Record};
use crate::schema::project;
use crate::sheet::{CellValue, HighlightRule, TabularStore, HIGHLIGHT_BACKGROUND};

/// A row that has been written, before any highlight is attached
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedRow {
    pub row_index: usize,
    pub cells: Vec<CellValue>,
}

/// Result of a single append
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    pub row_index: usize,
    pub highlight: Option<HighlightRule>,
}

/// Project `record` onto `columns` and append it as the sheet's last row
///
/// The first cell holding a priority label (High/Medium/Low) gets a
/// conditional rule that highlights it when it reads "High". Rules
/// accumulate across calls and are never replaced.
pub async fn append_record(
    store: &dyn TabularStore,
    sheet: &str,
    columns: &[String],
    record: &Record,
) -> Result<AppendOutcome, StoreError> {
    let appended = append_projected(store, sheet, columns, record).await?;
    let highlight = priority_highlight(&appended);

    if let Some(rule) = &highlight {
        add_priority_highlight(store, sheet, rule, &appended.cells).await?;
    }

    Ok(AppendOutcome {
        row_index: appended.row_index,
        highlight,
    })
}

/// Write the projected row only
///
/// The single store call that makes the row visible; callers that retry
/// must not repeat it once it returned Ok.
pub async fn append_projected(
    store: &dyn TabularStore,
    sheet: &str,
    columns: &[String],
    record: &Record,
) -> Result<AppendedRow, StoreError> {
    let cells = project(columns, record);
    let row_index = store.append_row(sheet, &cells).await?;

    log::debug!("✅ Appended row {} to '{}'", row_index, sheet);
    Ok(AppendedRow { row_index, cells })
}

/// Conditional rule for the row's priority cell, if it has one
pub fn priority_highlight(row: &AppendedRow) -> Option<HighlightRule> {
    priority_column(&row.cells).map(|column| HighlightRule {
        row: row.row_index,
        column,
        equals: Priority::High.as_str().to_string(),
        background: HIGHLIGHT_BACKGROUND.to_string(),
    })
}

pub async fn add_priority_highlight(
    store: &dyn TabularStore,
    sheet: &str,
    rule: &HighlightRule,
    cells: &[CellValue],
) -> Result<(), StoreError> {
    store.add_highlight_rule(sheet, rule.clone()).await?;
    log::debug!(
        "Priority cell at row {} column {} in '{}' (fires: {})",
        rule.row,
        rule.column,
        sheet,
        cells.get(rule.column).is_some_and(|cell| rule.fires(cell))
    );
    Ok(())
}

/// Position of the first cell that is exactly a priority label
fn priority_column(row: &[CellValue]) -> Option<usize> {
    row.iter()
        .position(|cell| cell.as_text().and_then(Priority::from_label).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{DefaultClassifier, Submission};
    use crate::schema::reconcile;
    use crate::sheet::MemoryStore;
    use chrono::Utc;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        let submission: Submission = match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        };
        Record::from_submission(&submission, &DefaultClassifier, Utc::now())
    }

    async fn sheet_with(store: &MemoryStore, rec: &Record) -> Vec<String> {
        store.create_sheet("s").await.unwrap();
        reconcile(store, "s", &rec.keys()).await.unwrap()
    }

    #[tokio::test]
    async fn test_append_round_trip() {
        let store = MemoryStore::new();
        let rec = record(json!({"name": "Ann", "details": {"age": 31}}));
        let columns = sheet_with(&store, &rec).await;

        let outcome = append_record(&store, "s", &columns, &rec).await.unwrap();

        let rows = store.get_all_rows("s").await.unwrap();
        assert_eq!(outcome.row_index, rows.len() - 1);
        let last = rows.last().unwrap();
        for (column, cell) in columns.iter().zip(last) {
            let expected = CellValue::from_value(rec.get(column).unwrap());
            assert_eq!(cell, &expected, "column {}", column);
        }
    }

    #[tokio::test]
    async fn test_appends_never_reorder() {
        let store = MemoryStore::new();
        let first = record(json!({"n": "first"}));
        let columns = sheet_with(&store, &first).await;
        append_record(&store, "s", &columns, &first).await.unwrap();

        let second = record(json!({"n": "second", "extra": "x"}));
        let columns = reconcile(&store, "s", &second.keys()).await.unwrap();
        append_record(&store, "s", &columns, &second).await.unwrap();

        let rows = store.get_all_rows("s").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], CellValue::Text("first".into()));
        assert_eq!(rows[1][0], CellValue::Text("second".into()));
        assert_eq!(rows[0].len(), columns.len());
        assert_eq!(*rows[0].last().unwrap(), CellValue::Empty);
    }

    #[tokio::test]
    async fn test_priority_cell_gets_rule() {
        let store = MemoryStore::new();
        let rec = record(json!({"name": "Ann", "urgency": "High", "backup": "Low"}));
        let columns = sheet_with(&store, &rec).await;

        let outcome = append_record(&store, "s", &columns, &rec).await.unwrap();

        let rule = outcome.highlight.unwrap();
        assert_eq!(rule.column, 1);
        assert_eq!(rule.row, 0);
        assert_eq!(rule.background, HIGHLIGHT_BACKGROUND);
        assert!(rule.fires(&CellValue::Text("High".into())));
    }

    #[tokio::test]
    async fn test_rules_accumulate() {
        let store = MemoryStore::new();
        let low = record(json!({"urgency": "Low"}));
        let columns = sheet_with(&store, &low).await;

        append_record(&store, "s", &columns, &low).await.unwrap();
        append_record(&store, "s", &columns, &record(json!({"urgency": "High"})))
            .await
            .unwrap();
        append_record(&store, "s", &columns, &record(json!({"urgency": "none"})))
            .await
            .unwrap();

        let rules = store.highlight_rules("s").await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].row, 0);
        assert_eq!(rules[1].row, 1);

        let rows = store.get_all_rows("s").await.unwrap();
        assert!(!rules[0].fires(&rows[0][rules[0].column]));
        assert!(rules[1].fires(&rows[1][rules[1].column]));
    }

    #[tokio::test]
    async fn test_append_projected_leaves_highlight_to_caller() {
        let store = MemoryStore::new();
        let rec = record(json!({"urgency": "High"}));
        let columns = sheet_with(&store, &rec).await;

        let appended = append_projected(&store, "s", &columns, &rec).await.unwrap();

        assert_eq!(appended.row_index, 0);
        assert!(store.highlight_rules("s").await.unwrap().is_empty());

        let rule = priority_highlight(&appended).unwrap();
        assert_eq!((rule.row, rule.column), (0, 0));
        add_priority_highlight(&store, "s", &rule, &appended.cells)
            .await
            .unwrap();
        assert_eq!(store.highlight_rules("s").await.unwrap(), vec![rule]);
    }
}
