//! In-process vector index

use super::{ChunkPoint, ChunkPayload, IndexedChunk, PointFilter, SearchResult, VectorIndex};
use crate::embed::cosine_similarity;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredPoint {
    id: Uuid,
    vector: Vec<f32>,
    payload: ChunkPayload,
}

/// Vector index held in memory; scrolls return insertion order
#[derive(Default)]
pub struct MemoryIndex {
    points: RwLock<Vec<StoredPoint>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()> {
        let mut stored = self.points.write().await;
        for point in points {
            let entry = StoredPoint {
                id: point.id,
                vector: point.vector,
                payload: point.payload,
            };
            match stored.iter_mut().find(|p| p.id == entry.id) {
                Some(existing) => *existing = entry,
                None => stored.push(entry),
            }
        }
        Ok(())
    }

    async fn scroll(&self, filter: &PointFilter, limit: Option<usize>) -> Result<Vec<IndexedChunk>> {
        let stored = self.points.read().await;
        Ok(stored
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .take(limit.unwrap_or(usize::MAX))
            .map(|p| IndexedChunk {
                id: p.id,
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<()> {
        self.points.write().await.retain(|p| !ids.contains(&p.id));
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: &PointFilter,
    ) -> Result<Vec<SearchResult>> {
        let stored = self.points.read().await;
        let mut results: Vec<SearchResult> = stored
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| SearchResult {
                id: p.id,
                score: cosine_similarity(&vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }
}
