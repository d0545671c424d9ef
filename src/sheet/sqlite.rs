//! SQLite-backed sheet store
//!
//! Schema:
//! - `sheets` - one row per sheet with its creation time
//! - `sheet_columns` - header row, one row per column position
//! - `sheet_rows` - data rows in insertion order, cells encoded as a JSON array
//! - `highlight_rules` - accumulated conditional highlights
//!
//! Every mutation runs in its own transaction, so a failed append leaves
//! no partial row behind.

use super::{check_row_range, pad_row, CellValue, HighlightRule, TabularStore};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sheets (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sheet_columns (
    sheet TEXT NOT NULL,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (sheet, position)
);

CREATE TABLE IF NOT EXISTS sheet_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sheet TEXT NOT NULL,
    cells TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sheet_rows_sheet ON sheet_rows(sheet, id);

CREATE TABLE IF NOT EXISTS highlight_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sheet TEXT NOT NULL,
    row_index INTEGER NOT NULL,
    column_index INTEGER NOT NULL,
    equals TEXT NOT NULL,
    background TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;

        log::info!(
            "✅ SQLite sheet store initialized at {} (journal: {})",
            db_path.display(),
            journal_mode
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn ensure_sheet(conn: &Connection, sheet: &str) -> Result<(), StoreError> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM sheets WHERE name = ?1")?
        .exists(params![sheet])?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::SheetNotFound(sheet.to_string()))
    }
}

fn row_count(conn: &Connection, sheet: &str) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sheet_rows WHERE sheet = ?1",
        params![sheet],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn header_width(conn: &Connection, sheet: &str) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sheet_columns WHERE sheet = ?1",
        params![sheet],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn clear_within(tx: &Transaction<'_>, sheet: &str) -> Result<(), StoreError> {
    tx.execute("DELETE FROM sheet_columns WHERE sheet = ?1", params![sheet])?;
    tx.execute("DELETE FROM sheet_rows WHERE sheet = ?1", params![sheet])?;
    tx.execute("DELETE FROM highlight_rules WHERE sheet = ?1", params![sheet])?;
    Ok(())
}

#[async_trait]
impl TabularStore for SqliteStore {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let exists = conn
            .prepare_cached("SELECT 1 FROM sheets WHERE name = ?1")?
            .exists(params![sheet])?;
        Ok(exists)
    }

    async fn create_sheet(&self, sheet: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?1, ?2)",
            params![sheet, Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)],
        )?;
        Ok(())
    }

    async fn sheet_created_at(&self, sheet: &str) -> Result<DateTime<Utc>, StoreError> {
        let conn = self.lock()?;
        let created: Option<String> = conn
            .query_row(
                "SELECT created_at FROM sheets WHERE name = ?1",
                params![sheet],
                |row| row.get(0),
            )
            .optional()?;

        let created = created.ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        DateTime::parse_from_rfc3339(&created)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidData(format!("sheet '{}' created_at: {}", sheet, e)))
    }

    async fn get_headers(&self, sheet: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        let mut stmt = conn.prepare_cached(
            "SELECT name FROM sheet_columns WHERE sheet = ?1 ORDER BY position",
        )?;
        let headers = stmt
            .query_map(params![sheet], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(headers)
    }

    async fn set_headers(&self, sheet: &str, headers: &[String]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sheet_columns WHERE sheet = ?1", params![sheet])?;
        for (position, name) in headers.iter().enumerate() {
            tx.execute(
                "INSERT INTO sheet_columns (sheet, position, name) VALUES (?1, ?2, ?3)",
                params![sheet, position as i64, name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;
        let width = header_width(&conn, sheet)?;

        let mut stmt =
            conn.prepare_cached("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY id")?;
        let encoded = stmt
            .query_map(params![sheet], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        encoded
            .iter()
            .map(|cells| -> Result<Vec<CellValue>, StoreError> {
                let row: Vec<CellValue> = serde_json::from_str(cells)?;
                Ok(pad_row(row, width))
            })
            .collect()
    }

    async fn append_row(&self, sheet: &str, row: &[CellValue]) -> Result<usize, StoreError> {
        let encoded = serde_json::to_string(row)?;

        let mut conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO sheet_rows (sheet, cells) VALUES (?1, ?2)",
            params![sheet, encoded],
        )?;
        let index = row_count(&tx, sheet)? - 1;
        tx.commit()?;
        Ok(index)
    }

    async fn delete_rows(
        &self,
        sheet: &str,
        start: usize,
        count: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;
        check_row_range(sheet, start, count, row_count(&conn, sheet)?)?;
        if count == 0 {
            return Ok(());
        }

        let end = start + count;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM sheet_rows WHERE id IN (
                SELECT id FROM sheet_rows WHERE sheet = ?1 ORDER BY id LIMIT ?2 OFFSET ?3
            )",
            params![sheet, count as i64, start as i64],
        )?;
        tx.execute(
            "DELETE FROM highlight_rules
             WHERE sheet = ?1 AND row_index >= ?2 AND row_index < ?3",
            params![sheet, start as i64, end as i64],
        )?;
        tx.execute(
            "UPDATE highlight_rules SET row_index = row_index - ?2
             WHERE sheet = ?1 AND row_index >= ?3",
            params![sheet, count as i64, end as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn clear_sheet(&self, sheet: &str) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        let tx = conn.transaction()?;
        clear_within(&tx, sheet)?;
        tx.commit()?;
        Ok(())
    }

    async fn add_highlight_rule(
        &self,
        sheet: &str,
        rule: HighlightRule,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        conn.execute(
            "INSERT INTO highlight_rules (sheet, row_index, column_index, equals, background)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sheet,
                rule.row as i64,
                rule.column as i64,
                rule.equals,
                rule.background,
            ],
        )?;
        Ok(())
    }

    async fn highlight_rules(&self, sheet: &str) -> Result<Vec<HighlightRule>, StoreError> {
        let conn = self.lock()?;
        ensure_sheet(&conn, sheet)?;

        let mut stmt = conn.prepare_cached(
            "SELECT row_index, column_index, equals, background
             FROM highlight_rules WHERE sheet = ?1 ORDER BY id",
        )?;
        let rules = stmt
            .query_map(params![sheet], |row| {
                Ok(HighlightRule {
                    row: row.get::<_, i64>(0)? as usize,
                    column: row.get::<_, i64>(1)? as usize,
                    equals: row.get(2)?,
                    background: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    fn sheet_url(&self, sheet: &str) -> String {
        format!("sqlite://{}#{}", self.db_path.display(), sheet)
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sqlite_sheet_lifecycle() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("forms.db")).unwrap();

        store.create_sheet("Contact").await.unwrap();
        store
            .set_headers("Contact", &headers(&["name", "age"]))
            .await
            .unwrap();
        let first = store
            .append_row("Contact", &[text("Ann"), CellValue::Number(31.0)])
            .await
            .unwrap();
        let second = store
            .append_row("Contact", &[text("Bob"), CellValue::Empty])
            .await
            .unwrap();

        assert_eq!((first, second), (0, 1));
        assert_eq!(
            store.get_headers("Contact").await.unwrap(),
            headers(&["name", "age"])
        );
        assert_eq!(
            store.get_all_rows("Contact").await.unwrap(),
            vec![
                vec![text("Ann"), CellValue::Number(31.0)],
                vec![text("Bob"), CellValue::Empty],
            ]
        );
    }

    #[tokio::test]
    async fn test_wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("forms.db");
        let _store = SqliteStore::open(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("forms.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.create_sheet("Survey").await.unwrap();
            store.set_headers("Survey", &headers(&["q1"])).await.unwrap();
            store.append_row("Survey", &[text("yes")]).await.unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        assert!(store.sheet_exists("Survey").await.unwrap());
        assert_eq!(
            store.get_all_rows("Survey").await.unwrap(),
            vec![vec![text("yes")]]
        );
        assert!(store.sheet_created_at("Survey").await.unwrap() <= Utc::now());
    }

    #[tokio::test]
    async fn test_delete_rows_range() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("forms.db")).unwrap();
        store.create_sheet("s").await.unwrap();
        store.set_headers("s", &headers(&["n"])).await.unwrap();
        for i in 0..6 {
            store.append_row("s", &[text(&i.to_string())]).await.unwrap();
        }
        store
            .add_highlight_rule(
                "s",
                HighlightRule {
                    row: 5,
                    column: 0,
                    equals: "High".into(),
                    background: "#f4cccc".into(),
                },
            )
            .await
            .unwrap();

        store.delete_rows("s", 1, 3).await.unwrap();

        assert_eq!(
            store.get_all_rows("s").await.unwrap(),
            vec![vec![text("0")], vec![text("4")], vec![text("5")]]
        );
        assert_eq!(store.highlight_rules("s").await.unwrap()[0].row, 2);
        assert!(matches!(
            store.delete_rows("s", 2, 2).await,
            Err(StoreError::RowRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_sheets_are_isolated() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("forms.db")).unwrap();
        store.create_sheet("a").await.unwrap();
        store.create_sheet("b").await.unwrap();
        store.set_headers("a", &headers(&["x"])).await.unwrap();
        store.append_row("a", &[text("1")]).await.unwrap();

        store.clear_sheet("b").await.unwrap();

        assert_eq!(store.get_all_rows("a").await.unwrap().len(), 1);
        assert!(store.get_all_rows("b").await.unwrap().is_empty());
        assert!(matches!(
            store.get_headers("c").await,
            Err(StoreError::SheetNotFound(_))
        ));
    }
}
