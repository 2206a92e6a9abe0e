//! Vector index integration
//!
//! This module defines the [`VectorIndex`] boundary used by the chunk store
//! and retriever, and provides:
//! - `QdrantStore`, the production implementation (collection management,
//!   payload indexes, paged scroll)
//! - `MemoryIndex`, an in-process implementation for tests

mod memory;
mod payload;

pub use memory::MemoryIndex;
pub use payload::*;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A stored chunk as returned by a scroll
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: Uuid,
    pub payload: ChunkPayload,
}

/// Search result
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: Uuid,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Exact-match payload filter; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    pub document_id: Option<String>,
    pub filename: Option<String>,
    pub chunk_index: Option<usize>,
}

impl PointFilter {
    pub fn document(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            ..Self::default()
        }
    }

    pub fn filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    /// Only the first chunk of each document
    pub fn first_chunks() -> Self {
        Self {
            chunk_index: Some(0),
            ..Self::default()
        }
    }

    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        self.document_id
            .as_deref()
            .map_or(true, |id| payload.document_id == id)
            && self
                .filename
                .as_deref()
                .map_or(true, |name| payload.filename == name)
            && self
                .chunk_index
                .map_or(true, |index| payload.chunk_index == index)
    }

    fn to_qdrant_filter(&self) -> Option<Filter> {
        let mut must_conditions: Vec<Condition> = Vec::new();

        if let Some(ref document_id) = self.document_id {
            must_conditions.push(Condition::matches("document_id", document_id.clone()));
        }

        if let Some(ref filename) = self.filename {
            must_conditions.push(Condition::matches("filename", filename.clone()));
        }

        if let Some(index) = self.chunk_index {
            must_conditions.push(Condition::matches("chunk_index", index as i64));
        }

        if must_conditions.is_empty() {
            return None;
        }

        Some(Filter::must(must_conditions))
    }
}

/// The vector index operations the chunk store relies on
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection and payload indexes if missing
    async fn ensure_ready(&self) -> Result<()>;

    /// Insert or replace points
    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()>;

    /// All points matching `filter`, in storage order, up to `limit`
    async fn scroll(&self, filter: &PointFilter, limit: Option<usize>) -> Result<Vec<IndexedChunk>>;

    /// Delete points by id; unknown ids are ignored
    async fn delete(&self, ids: &[Uuid]) -> Result<()>;

    /// Up to `k` points most similar to `vector`, best first
    async fn search(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &PointFilter,
    ) -> Result<Vec<SearchResult>>;
}

/// Information about a Qdrant collection
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub status: String,
}

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Connect to Qdrant using config
    pub fn connect(config: &Config) -> Result<Self> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key(),
            &config.collection_name,
            config.embedding.dimension,
        )
    }

    /// Create a new store connection directly with URL and collection name
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ensure the collection exists with correct configuration
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        for (field, field_type) in [
            ("document_id", FieldType::Keyword),
            ("filename", FieldType::Keyword),
            ("chunk_index", FieldType::Integer),
        ] {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    field,
                    field_type,
                ))
                .await?;
        }

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    /// Reset the collection (delete and recreate)
    pub async fn reset_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            info!("Deleting existing collection {}", self.collection);
            self.client.delete_collection(&self.collection).await?;
        }

        self.ensure_collection().await
    }

    /// Get collection info (point count, etc)
    pub async fn get_collection_info(&self) -> Result<Option<CollectionInfo>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(&self.collection).await?;
        Ok(info.result.map(|result| CollectionInfo {
            points_count: result.points_count.unwrap_or(0),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
            status: format!("{:?}", result.status()),
        }))
    }

    fn check_dimensions(&self, points: &[ChunkPoint]) -> Result<()> {
        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {} (got {})",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_ready(&self) -> Result<()> {
        self.ensure_collection().await
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.check_dimensions(&points)?;

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<PointStruct> =
            points.into_iter().map(ChunkPoint::to_point_struct).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, point_structs).wait(true))
            .await?;

        Ok(())
    }

    async fn scroll(&self, filter: &PointFilter, limit: Option<usize>) -> Result<Vec<IndexedChunk>> {
        let mut chunks = Vec::new();
        let mut offset: Option<PointId> = None;
        let page_size = 256u32;

        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .limit(page_size)
                .with_payload(true)
                .with_vectors(false);

            if let Some(qdrant_filter) = filter.to_qdrant_filter() {
                scroll_builder = scroll_builder.filter(qdrant_filter);
            }

            if let Some(o) = offset.take() {
                scroll_builder = scroll_builder.offset(o);
            }

            let response = self.client.scroll(scroll_builder).await?;

            for point in response.result {
                let Some(id) = point.id.as_ref().and_then(point_id_to_uuid) else {
                    continue;
                };
                match ChunkPayload::from_qdrant_payload(point.payload) {
                    Ok(payload) => chunks.push(IndexedChunk { id, payload }),
                    Err(e) => warn!("Skipping point {}: {}", id, e),
                }
                if limit.is_some_and(|max| chunks.len() >= max) {
                    return Ok(chunks);
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(chunks)
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!(
            "Deleting {} points from collection {}",
            ids.len(),
            self.collection
        );

        let ids: Vec<PointId> = ids.iter().map(|id| PointId::from(id.to_string())).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(ids)
                    .wait(true),
            )
            .await?;

        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &PointFilter,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching collection {} with limit {}", self.collection, k);

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true);

        if let Some(qdrant_filter) = filter.to_qdrant_filter() {
            search_builder = search_builder.filter(qdrant_filter);
        }

        let response = self.client.search_points(search_builder).await?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let Some(id) = point.id.as_ref().and_then(point_id_to_uuid) else {
                continue;
            };
            match ChunkPayload::from_qdrant_payload(point.payload) {
                Ok(payload) => results.push(SearchResult {
                    id,
                    score: point.score,
                    payload,
                }),
                Err(e) => warn!("Skipping point {}: {}", id, e),
            }
        }

        Ok(results)
    }
}

/// Convert PointId to UUID
fn point_id_to_uuid(id: &PointId) -> Option<Uuid> {
    match &id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid_str)) => {
            Uuid::try_parse(uuid_str).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(document_id: &str, filename: &str, index: usize) -> ChunkPayload {
        ChunkPayload {
            document_id: document_id.to_string(),
            filename: filename.to_string(),
            upload_timestamp: "2024-01-01T08:00:00+08:00".to_string(),
            chunk_index: index,
            chunk_text: format!("chunk {}", index),
            content_hash: None,
            document_text: None,
        }
    }

    #[test]
    fn test_point_filter_to_qdrant() {
        assert!(PointFilter::default().to_qdrant_filter().is_none());

        let filter = PointFilter {
            document_id: Some("doc".to_string()),
            filename: Some("a.txt".to_string()),
            chunk_index: Some(0),
        };
        let qdrant_filter = filter.to_qdrant_filter().unwrap();
        assert_eq!(qdrant_filter.must.len(), 3);
    }

    #[test]
    fn test_point_filter_matches() {
        let p = payload("doc", "a.txt", 2);

        assert!(PointFilter::default().matches(&p));
        assert!(PointFilter::filename("a.txt").matches(&p));
        assert!(!PointFilter::filename("b.txt").matches(&p));
        assert!(!PointFilter::first_chunks().matches(&p));
        assert!(PointFilter::document("doc").matches(&p));
    }

    #[tokio::test]
    async fn test_upsert_rejects_dimension_mismatch() {
        let store = QdrantStore::new("http://127.0.0.1:6334", None, "test_collection", 3)
            .expect("store should initialize");

        let point = ChunkPoint {
            id: Uuid::new_v4(),
            vector: vec![0.1, 0.2],
            payload: payload("doc", "a.txt", 0),
        };

        let err = store
            .upsert(vec![point])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Qdrant(message) => assert!(message.contains("Vector dimension mismatch")),
            other => panic!("expected qdrant error, got {other:?}"),
        }
    }
}
