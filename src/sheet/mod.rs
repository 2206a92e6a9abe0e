//! Spreadsheet-style tabular storage for quizzes and results
//!
//! Each worksheet is a header row plus ordered data rows of text cells. Row
//! indices are 0-based and count data rows only. Domain types never see this
//! shape directly; the quiz repository and result store translate at the
//! boundary.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemorySheetStore;
pub use schema::*;
pub use sqlite::{SheetStats, SqliteSheetStore};

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub type Row = Vec<String>;

/// A data row keyed by header name
pub type Record = BTreeMap<String, String>;

#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Create `sheet` with `header`, or verify an existing header matches
    async fn ensure_sheet(&self, sheet: &str, header: &[&str]) -> Result<()>;

    /// Header row of `sheet`
    async fn header(&self, sheet: &str) -> Result<Vec<String>>;

    /// All data rows in insertion order
    async fn rows(&self, sheet: &str) -> Result<Vec<Row>>;

    async fn append_row(&self, sheet: &str, row: Row) -> Result<()>;

    /// Remove the data row at `index`
    async fn delete_row(&self, sheet: &str, index: usize) -> Result<()>;

    /// Overwrite cells of row `index` starting at column `start_col`.
    ///
    /// Quizzes and results are never edited in place; this completes the
    /// spreadsheet surface for callers that need it.
    async fn update_range(
        &self,
        sheet: &str,
        index: usize,
        start_col: usize,
        values: Vec<String>,
    ) -> Result<()>;

    /// Data rows keyed by header; missing trailing cells read as empty
    async fn get_all_records(&self, sheet: &str) -> Result<Vec<Record>> {
        let header = self.header(sheet).await?;
        let rows = self.rows(sheet).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                header
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect())
    }

    /// Cell `col` of every data row
    async fn column_values(&self, sheet: &str, col: usize) -> Result<Vec<String>> {
        Ok(self
            .rows(sheet)
            .await?
            .into_iter()
            .map(|row| row.get(col).cloned().unwrap_or_default())
            .collect())
    }

    /// Number of data rows
    async fn row_count(&self, sheet: &str) -> Result<usize> {
        Ok(self.rows(sheet).await?.len())
    }
}

pub(crate) fn header_mismatch(sheet: &str, existing: &[String], wanted: &[&str]) -> Error {
    Error::Config(format!(
        "worksheet '{}' has header [{}], expected [{}]",
        sheet,
        existing.join(", "),
        wanted.join(", ")
    ))
}

pub(crate) fn missing_sheet(sheet: &str) -> Error {
    Error::NotFound(format!("worksheet '{}'", sheet))
}

pub(crate) fn missing_row(sheet: &str, index: usize) -> Error {
    Error::NotFound(format!("row {} in worksheet '{}'", index, sheet))
}

/// Write `values` into `row` from `start_col`, growing the row if needed
pub(crate) fn splice_cells(row: &mut Row, start_col: usize, values: Vec<String>) {
    let needed = start_col + values.len();
    if row.len() < needed {
        row.resize(needed, String::new());
    }
    for (offset, value) in values.into_iter().enumerate() {
        row[start_col + offset] = value;
    }
}
