//! Database administration: Qdrant collection and local worksheets

use crate::config::Config;
use crate::error::Result;
use crate::sheet::{SheetStats, SqliteSheetStore};
use crate::store::QdrantStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub qdrant_url: String,
    pub collection_name: String,
    pub collection_exists: bool,
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub collection_status: Option<String>,
    pub db_path: String,
    pub sheets: Vec<SheetStats>,
}

/// Create the Qdrant collection and the local schema if missing
pub async fn cmd_db_init(config: &Config) -> Result<()> {
    QdrantStore::connect(config)?.ensure_collection().await?;
    SqliteSheetStore::new(&config.paths.db_file).await?;
    Ok(())
}

pub async fn cmd_db_status(config: &Config) -> Result<DbStatus> {
    let store = QdrantStore::connect(config)?;
    let info = store.get_collection_info().await?;
    let sheets = SqliteSheetStore::new(&config.paths.db_file).await?;

    Ok(DbStatus {
        qdrant_url: config.qdrant_url.clone(),
        collection_name: config.collection_name.clone(),
        collection_exists: info.is_some(),
        points_count: info.as_ref().map_or(0, |i| i.points_count),
        indexed_vectors_count: info.as_ref().map_or(0, |i| i.indexed_vectors_count),
        collection_status: info.map(|i| i.status),
        db_path: config.paths.db_file.display().to_string(),
        sheets: sheets.stats().await?,
    })
}

/// Delete every vector, quiz and result
pub async fn cmd_db_reset(config: &Config) -> Result<()> {
    QdrantStore::connect(config)?.reset_collection().await?;
    SqliteSheetStore::new(&config.paths.db_file)
        .await?
        .reset()
        .await?;
    Ok(())
}

pub fn print_db_status(status: &DbStatus) {
    println!("\n📊 quizzer Status\n");
    println!("Qdrant:");
    println!("  URL: {}", status.qdrant_url);
    println!("  Collection: {}", status.collection_name);
    if status.collection_exists {
        println!(
            "  Status: {}",
            status.collection_status.as_deref().unwrap_or("unknown")
        );
        println!("  Points: {}", status.points_count);
        println!("  Indexed Vectors: {}", status.indexed_vectors_count);
    } else {
        println!("  ⚠ Collection does not exist. Run 'quizzer db init' to create it.");
    }

    println!("\nDatabase: {}", status.db_path);
    if status.sheets.is_empty() {
        println!("  No worksheets yet");
    }
    for sheet in &status.sheets {
        println!("  {}: {} rows", sheet.sheet, sheet.rows);
    }
}
