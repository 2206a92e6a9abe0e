use super::{header_mismatch, missing_row, missing_sheet, splice_cells, Row, SheetStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Sheet {
    header: Vec<String>,
    rows: Vec<Row>,
}

/// Worksheets held in memory
#[derive(Default)]
pub struct MemorySheetStore {
    sheets: RwLock<HashMap<String, Sheet>>,
}

impl MemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn ensure_sheet(&self, sheet: &str, header: &[&str]) -> Result<()> {
        let mut sheets = self.sheets.write().await;
        if let Some(existing) = sheets.get(sheet) {
            if existing.header != header {
                return Err(header_mismatch(sheet, &existing.header, header));
            }
            return Ok(());
        }

        sheets.insert(
            sheet.to_string(),
            Sheet {
                header: header.iter().map(|h| h.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn header(&self, sheet: &str) -> Result<Vec<String>> {
        let sheets = self.sheets.read().await;
        let sheet_data = sheets.get(sheet).ok_or_else(|| missing_sheet(sheet))?;
        Ok(sheet_data.header.clone())
    }

    async fn rows(&self, sheet: &str) -> Result<Vec<Row>> {
        let sheets = self.sheets.read().await;
        let sheet_data = sheets.get(sheet).ok_or_else(|| missing_sheet(sheet))?;
        Ok(sheet_data.rows.clone())
    }

    async fn append_row(&self, sheet: &str, row: Row) -> Result<()> {
        let mut sheets = self.sheets.write().await;
        let sheet_data = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        sheet_data.rows.push(row);
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<()> {
        let mut sheets = self.sheets.write().await;
        let sheet_data = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        if index >= sheet_data.rows.len() {
            return Err(missing_row(sheet, index));
        }
        sheet_data.rows.remove(index);
        Ok(())
    }

    async fn update_range(
        &self,
        sheet: &str,
        index: usize,
        start_col: usize,
        values: Vec<String>,
    ) -> Result<()> {
        let mut sheets = self.sheets.write().await;
        let sheet_data = sheets.get_mut(sheet).ok_or_else(|| missing_sheet(sheet))?;
        let row = sheet_data
            .rows
            .get_mut(index)
            .ok_or_else(|| missing_row(sheet, index))?;
        splice_cells(row, start_col, values);
        Ok(())
    }
}
