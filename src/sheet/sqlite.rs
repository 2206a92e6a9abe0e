use super::{
    header_mismatch, missing_row, missing_sheet, splice_cells, Row, SheetStore, SCHEMA_SQL,
};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Worksheets stored in a local SQLite database
pub struct SqliteSheetStore {
    pool: SqlitePool,
}

/// Row count for one worksheet
#[derive(Debug, Clone, Serialize)]
pub struct SheetStats {
    pub sheet: String,
    pub rows: usize,
}

impl SqliteSheetStore {
    /// Connect to the database named in config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open the database and create the schema if it is missing
    pub async fn new(db_path: &Path) -> Result<Self> {
        let store = Self::open(db_path).await?;
        if !store.is_initialized().await? {
            store.init_schema().await?;
        }
        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='sheet_rows'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(result.is_some())
    }

    /// Remove every worksheet and row
    pub async fn reset(&self) -> Result<()> {
        info!("Clearing all worksheets");
        sqlx::query("DELETE FROM sheet_rows")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM sheet_headers")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Row counts per worksheet
    pub async fn stats(&self) -> Result<Vec<SheetStats>> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT h.sheet, COUNT(r.id)
            FROM sheet_headers h
            LEFT JOIN sheet_rows r ON r.sheet = h.sheet
            GROUP BY h.sheet
            ORDER BY h.sheet
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts
            .into_iter()
            .map(|(sheet, rows)| SheetStats {
                sheet,
                rows: rows as usize,
            })
            .collect())
    }

    async fn stored_header(&self, sheet: &str) -> Result<Option<Vec<String>>> {
        let header_json: Option<String> =
            sqlx::query_scalar("SELECT header_json FROM sheet_headers WHERE sheet = ?")
                .bind(sheet)
                .fetch_optional(&self.pool)
                .await?;
        match header_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Rowid of the data row at `index`
    async fn row_id(&self, sheet: &str, index: usize) -> Result<Option<(i64, String)>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "SELECT id, cells_json FROM sheet_rows WHERE sheet = ? ORDER BY id LIMIT 1 OFFSET ?",
        )
        .bind(sheet)
        .bind(index as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn require_sheet(&self, sheet: &str) -> Result<Vec<String>> {
        self.stored_header(sheet)
            .await?
            .ok_or_else(|| missing_sheet(sheet))
    }
}

#[async_trait]
impl SheetStore for SqliteSheetStore {
    async fn ensure_sheet(&self, sheet: &str, header: &[&str]) -> Result<()> {
        if let Some(existing) = self.stored_header(sheet).await? {
            if existing != header {
                return Err(header_mismatch(sheet, &existing, header));
            }
            return Ok(());
        }

        debug!("Creating worksheet {}", sheet);
        sqlx::query(
            r#"
            INSERT INTO sheet_headers (sheet, header_json, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(sheet) DO NOTHING
            "#,
        )
        .bind(sheet)
        .bind(serde_json::to_string(header)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn header(&self, sheet: &str) -> Result<Vec<String>> {
        self.require_sheet(sheet).await
    }

    async fn rows(&self, sheet: &str) -> Result<Vec<Row>> {
        self.require_sheet(sheet).await?;
        let cells: Vec<String> =
            sqlx::query_scalar("SELECT cells_json FROM sheet_rows WHERE sheet = ? ORDER BY id")
                .bind(sheet)
                .fetch_all(&self.pool)
                .await?;

        let mut rows = Vec::with_capacity(cells.len());
        for json in &cells {
            rows.push(serde_json::from_str(json)?);
        }
        Ok(rows)
    }

    async fn append_row(&self, sheet: &str, row: Row) -> Result<()> {
        self.require_sheet(sheet).await?;
        sqlx::query("INSERT INTO sheet_rows (sheet, cells_json, created_at) VALUES (?, ?, ?)")
            .bind(sheet)
            .bind(serde_json::to_string(&row)?)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<()> {
        let (id, _) = self
            .row_id(sheet, index)
            .await?
            .ok_or_else(|| missing_row(sheet, index))?;

        sqlx::query("DELETE FROM sheet_rows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_range(
        &self,
        sheet: &str,
        index: usize,
        start_col: usize,
        values: Vec<String>,
    ) -> Result<()> {
        let (id, cells_json) = self
            .row_id(sheet, index)
            .await?
            .ok_or_else(|| missing_row(sheet, index))?;

        let mut row: Row = serde_json::from_str(&cells_json)?;
        splice_cells(&mut row, start_col, values);

        sqlx::query("UPDATE sheet_rows SET cells_json = ? WHERE id = ?")
            .bind(serde_json::to_string(&row)?)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn row_count(&self, sheet: &str) -> Result<usize> {
        self.require_sheet(sheet).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sheet_rows WHERE sheet = ?")
            .bind(sheet)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    async fn setup_test_store() -> (SqliteSheetStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("test.db");

        let store = SqliteSheetStore::connect(&config).await.unwrap();
        store.init_schema().await.unwrap();
        (store, tmp)
    }

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_rows_keep_insertion_order() {
        let (store, _tmp) = setup_test_store().await;
        store.ensure_sheet("s", &["id", "name"]).await.unwrap();
        store.ensure_sheet("s", &["id", "name"]).await.unwrap();

        store.append_row("s", row(&["1", "one"])).await.unwrap();
        store.append_row("s", row(&["2"])).await.unwrap();

        let records = store.get_all_records("s").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "one");
        assert_eq!(records[1]["name"], "");
        assert_eq!(store.column_values("s", 0).await.unwrap(), vec!["1", "2"]);
        assert_eq!(store.row_count("s").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_header_mismatch_and_missing_sheet() {
        let (store, _tmp) = setup_test_store().await;
        store.ensure_sheet("s", &["id"]).await.unwrap();

        assert!(matches!(
            store.ensure_sheet("s", &["other"]).await,
            Err(Error::Config(_))
        ));
        assert!(matches!(
            store.append_row("nope", row(&["x"])).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_update_by_position() {
        let (store, _tmp) = setup_test_store().await;
        store.ensure_sheet("s", &["id", "v"]).await.unwrap();
        for id in ["0", "1", "2"] {
            store.append_row("s", row(&[id, "x"])).await.unwrap();
        }

        store.delete_row("s", 1).await.unwrap();
        assert_eq!(store.column_values("s", 0).await.unwrap(), vec!["0", "2"]);

        store
            .update_range("s", 1, 1, vec!["y".to_string()])
            .await
            .unwrap();
        assert_eq!(store.rows("s").await.unwrap()[1], row(&["2", "y"]));

        assert!(matches!(
            store.delete_row("s", 5).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reopen_and_stats() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sheets.db");
        {
            let store = SqliteSheetStore::new(&path).await.unwrap();
            store.ensure_sheet("s", &["id"]).await.unwrap();
            store.append_row("s", row(&["1"])).await.unwrap();
        }

        let store = SqliteSheetStore::new(&path).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].rows, 1);

        store.reset().await.unwrap();
        assert!(store.stats().await.unwrap().is_empty());
    }
}
