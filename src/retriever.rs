//! Passage retrieval for question answering
//!
//! Strategies are tried in order until one returns passages. An empty result
//! from an earlier strategy is normal and simply moves on to the next one;
//! only the last strategy's error is surfaced.

use crate::documents::ChunkStore;
use crate::error::{Error, Result};
use crate::store::PointFilter;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

/// Where a passage came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassageMetadata {
    pub filename: String,
    pub chunk_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// A retrieved chunk of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,
    pub metadata: PassageMetadata,
}

#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn retrieve(&self, question: &str, filename: &str, k: usize) -> Result<Vec<Passage>>;
}

/// Similarity search restricted to the latest upload of one filename
pub struct VectorSearchStrategy {
    store: ChunkStore,
}

impl VectorSearchStrategy {
    pub fn new(store: ChunkStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetrievalStrategy for VectorSearchStrategy {
    fn name(&self) -> &'static str {
        "vector-search"
    }

    async fn retrieve(&self, question: &str, filename: &str, k: usize) -> Result<Vec<Passage>> {
        let Some(document_id) = self.store.latest_document_id(filename).await? else {
            return Ok(Vec::new());
        };

        let mut vectors = self.store.embedder().embed(vec![question.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("No embedding returned for query".to_string()))?;

        let results = self
            .store
            .index()
            .search(
                vector,
                k,
                &PointFilter {
                    document_id: Some(document_id),
                    ..PointFilter::filename(filename)
                },
            )
            .await?;

        Ok(results
            .into_iter()
            .map(|r| Passage {
                text: r.payload.chunk_text,
                metadata: PassageMetadata {
                    filename: r.payload.filename,
                    chunk_index: r.payload.chunk_index,
                    document_id: Some(r.payload.document_id),
                    score: Some(r.score),
                },
            })
            .collect())
    }
}

/// Every chunk of the file, in document order
pub struct ChunkScanStrategy {
    store: ChunkStore,
}

impl ChunkScanStrategy {
    pub fn new(store: ChunkStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetrievalStrategy for ChunkScanStrategy {
    fn name(&self) -> &'static str {
        "chunk-scan"
    }

    async fn retrieve(&self, _question: &str, filename: &str, _k: usize) -> Result<Vec<Passage>> {
        Ok(self
            .store
            .get_chunks(filename)
            .await?
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Passage {
                text,
                metadata: PassageMetadata {
                    filename: filename.to_string(),
                    chunk_index,
                    document_id: None,
                    score: None,
                },
            })
            .collect())
    }
}

pub struct Retriever {
    strategies: Vec<Box<dyn RetrievalStrategy>>,
}

impl Retriever {
    /// Vector search first, full chunk scan as fallback
    pub fn new(store: &ChunkStore) -> Self {
        Self::with_strategies(vec![
            Box::new(VectorSearchStrategy::new(store.clone())),
            Box::new(ChunkScanStrategy::new(store.clone())),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn RetrievalStrategy>>) -> Self {
        Self { strategies }
    }

    /// Up to `k` passages from `filename` relevant to `question`.
    ///
    /// The fallback scan is not limited by `k`.
    pub async fn query(&self, question: &str, filename: &str, k: usize) -> Result<Vec<Passage>> {
        let last = self.strategies.len().saturating_sub(1);

        for (i, strategy) in self.strategies.iter().enumerate() {
            match strategy.retrieve(question, filename, k).await {
                Ok(passages) if !passages.is_empty() => {
                    debug!(
                        "{} returned {} passages for '{}'",
                        strategy.name(),
                        passages.len(),
                        filename
                    );
                    return Ok(passages);
                }
                Ok(_) => debug!("{} found nothing for '{}'", strategy.name(), filename),
                Err(e) if i < last => {
                    warn!("{} failed, trying next strategy: {}", strategy.name(), e)
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::documents::{ChunkStoreSettings, IngestOptions};
    use crate::embed::Embedder;
    use crate::store::MemoryIndex;
    use crate::testing::{keyword_vector, KeywordEmbedder, TEST_DIMENSION};
    use std::sync::Arc;

    const TEXT: &str = "Paris is the capital of France. \
        Berlin is the capital of Germany. \
        Madrid is the capital of Spain.";

    fn store_with(embedder: Arc<dyn Embedder>) -> ChunkStore {
        let mut settings = ChunkStoreSettings::from_config(&Config::default()).unwrap();
        settings.max_chars = 40;
        ChunkStore::new(Arc::new(MemoryIndex::new()), embedder, settings)
    }

    /// Embeds documents normally but fails for single-text queries
    struct QueryFailingEmbedder;

    #[async_trait]
    impl Embedder for QueryFailingEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            if texts.len() == 1 && texts[0].ends_with('?') {
                return Err(Error::Embedding("query embedding down".to_string()));
            }
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            TEST_DIMENSION
        }

        fn model_name(&self) -> &str {
            "query-failing"
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl RetrievalStrategy for AlwaysFails {
        fn name(&self) -> &'static str {
            "always-fails"
        }

        async fn retrieve(&self, _: &str, _: &str, _: usize) -> Result<Vec<Passage>> {
            Err(Error::Qdrant("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_vector_search_limits_to_k() {
        let store = store_with(Arc::new(KeywordEmbedder));
        store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap();

        let passages = Retriever::new(&store)
            .query("capital of Germany", "capitals.txt", 2)
            .await
            .unwrap();

        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| p.metadata.score.is_some()));
    }

    #[tokio::test]
    async fn test_falls_back_to_chunk_scan_when_search_fails() {
        let store = store_with(Arc::new(QueryFailingEmbedder));
        store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap();

        let passages = Retriever::new(&store)
            .query("What is the capital of Spain?", "capitals.txt", 1)
            .await
            .unwrap();

        assert_eq!(passages.len(), 3);
        let indices: Vec<usize> = passages.iter().map(|p| p.metadata.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(passages[0].metadata.filename, "capitals.txt");
        assert!(passages[0].metadata.score.is_none());
    }

    #[tokio::test]
    async fn test_both_strategies_serve_the_latest_upload() {
        let store = store_with(Arc::new(KeywordEmbedder));
        store
            .ingest(
                "Rome is the capital of Italy.",
                "capitals.txt",
                IngestOptions::default(),
            )
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let latest = store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap()
            .to_string();

        let searched = VectorSearchStrategy::new(store.clone())
            .retrieve("capital of Italy", "capitals.txt", 10)
            .await
            .unwrap();
        let scanned = ChunkScanStrategy::new(store.clone())
            .retrieve("capital of Italy", "capitals.txt", 10)
            .await
            .unwrap();

        assert_eq!(searched.len(), 3);
        assert!(searched
            .iter()
            .all(|p| p.metadata.document_id.as_deref() == Some(latest.as_str())));
        assert!(searched.iter().all(|p| !p.text.contains("Rome")));
        assert_eq!(scanned.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_file_yields_nothing() {
        let store = store_with(Arc::new(KeywordEmbedder));
        let passages = Retriever::new(&store)
            .query("anything", "missing.txt", 3)
            .await
            .unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn test_last_strategy_error_is_surfaced() {
        let retriever = Retriever::with_strategies(vec![Box::new(AlwaysFails)]);
        let err = retriever.query("q", "f.txt", 1).await.unwrap_err();
        assert!(matches!(err, Error::Qdrant(_)));
    }
}
