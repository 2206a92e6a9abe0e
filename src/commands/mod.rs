//! CLI commands implementation

pub mod ask;
pub mod db;
pub mod documents;
pub mod init;
pub mod quizzes;
pub mod results;
pub mod take;

pub use ask::*;
pub use db::*;
pub use documents::*;
pub use init::*;
pub use quizzes::*;
pub use results::*;
pub use take::*;

use crate::config::Config;
use crate::documents::{ChunkStore, ChunkStoreSettings};
use crate::embed::{create_embedder, Embedder};
use crate::error::Result;
use crate::sheet::{SheetStore, SqliteSheetStore};
use crate::store::{QdrantStore, VectorIndex};
use std::sync::Arc;

/// Chunk store backed by Qdrant and the configured embedding service
pub async fn open_chunk_store(config: &Config) -> Result<ChunkStore> {
    let index: Arc<dyn VectorIndex> = Arc::new(QdrantStore::connect(config)?);
    index.ensure_ready().await?;
    let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(config)?);
    Ok(ChunkStore::new(
        index,
        embedder,
        ChunkStoreSettings::from_config(config)?,
    ))
}

/// Quiz and result worksheets in the local SQLite database
pub async fn open_sheets(config: &Config) -> Result<Arc<dyn SheetStore>> {
    let store = SqliteSheetStore::new(&config.paths.db_file).await?;
    Ok(Arc::new(store))
}

/// First `limit` characters of `text` on a single line
pub(crate) fn preview(text: &str, limit: usize) -> String {
    let flat = text.trim().replace('\n', " ");
    if flat.chars().count() > limit {
        format!("{}...", crate::prompts::truncate_chars(&flat, limit).trim_end())
    } else {
        flat
    }
}
