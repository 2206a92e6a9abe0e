//! Document ingestion and chunk storage
//!
//! A document is stored as its chunks in the vector index. Every chunk carries
//! `{document_id, filename, upload_timestamp, chunk_index, chunk_text}`; the
//! first chunk also carries the full text and its content hash so the whole
//! document can be recovered without reassembling chunks.

use crate::chunk::{compute_content_hash, split_text};
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::store::{ChunkPayload, ChunkPoint, PointFilter, VectorIndex};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A logical document, rebuilt from its first chunk
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub upload_timestamp: String,
    #[serde(skip_serializing)]
    pub full_text: String,
    pub content_hash: Option<String>,
}

/// Per-call chunking overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Maximum characters per chunk
    pub chunk_size: Option<usize>,
    /// Overlap between chunks; `None` or zero means contiguous chunks
    pub chunk_overlap: Option<usize>,
}

/// Limits and batch sizes used by [`ChunkStore`]
#[derive(Debug, Clone)]
pub struct ChunkStoreSettings {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
    pub upsert_retries: usize,
    pub max_document_chars: usize,
    pub offset: FixedOffset,
}

impl ChunkStoreSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            max_chars: config.chunk.max_chars,
            overlap_chars: config.chunk.overlap_chars,
            embed_batch_size: config.embedding.batch_size,
            upsert_batch_size: config.chunk.upsert_batch_size,
            upsert_retries: config.chunk.upsert_retries,
            max_document_chars: config.chunk.max_document_chars,
            offset: config.session.offset()?,
        })
    }
}

/// Chunks, embeds and indexes documents, and reads them back
#[derive(Clone)]
pub struct ChunkStore {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    settings: ChunkStoreSettings,
}

impl ChunkStore {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        settings: ChunkStoreSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            settings,
        }
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Chunk, embed and index `document_text`, returning the new document id.
    ///
    /// Oversized or blank text is rejected before anything is embedded or
    /// written. If a batch still fails after its retries, points already
    /// written for this document are removed before the error is returned.
    pub async fn ingest(
        &self,
        document_text: &str,
        filename: &str,
        options: IngestOptions,
    ) -> Result<Uuid> {
        let len = document_text.chars().count();
        if len > self.settings.max_document_chars {
            return Err(Error::SizeLimitExceeded {
                len,
                max: self.settings.max_document_chars,
            });
        }
        if document_text.trim().is_empty() {
            return Err(Error::EmptyDocument);
        }

        let chunk_size = options.chunk_size.unwrap_or(self.settings.max_chars);
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be positive".to_string(),
            ));
        }
        let overlap = options.chunk_overlap.unwrap_or(self.settings.overlap_chars);

        let chunks = split_text(document_text, chunk_size, overlap);
        let content_hash = compute_content_hash(document_text);

        if self.find_by_hash(&content_hash).await?.is_some() {
            warn!(
                "Identical content was uploaded before; storing '{}' as a new document",
                filename
            );
        }

        let document_id = Uuid::new_v4();
        let upload_timestamp = Utc::now()
            .with_timezone(&self.settings.offset)
            .to_rfc3339_opts(SecondsFormat::Micros, false);
        info!(
            "Ingesting '{}' as {} ({} chunks)",
            filename,
            document_id,
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors =
            embed_in_batches(self.embedder.as_ref(), texts, self.settings.embed_batch_size)
                .await?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let first = chunk.index == 0;
                ChunkPoint {
                    id: Uuid::new_v4(),
                    vector,
                    payload: ChunkPayload {
                        document_id: document_id.to_string(),
                        filename: filename.to_string(),
                        upload_timestamp: upload_timestamp.clone(),
                        chunk_index: chunk.index,
                        chunk_text: chunk.text,
                        content_hash: first.then(|| content_hash.clone()),
                        document_text: first.then(|| document_text.to_string()),
                    },
                }
            })
            .collect();

        let mut written: Vec<Uuid> = Vec::with_capacity(points.len());
        for batch in points.chunks(self.settings.upsert_batch_size.max(1)) {
            if let Err(e) = self.upsert_with_retry(batch).await {
                if !written.is_empty() {
                    warn!(
                        "Removing {} points already written for {}",
                        written.len(),
                        document_id
                    );
                    if let Err(cleanup) = self.index.delete(&written).await {
                        warn!("Cleanup after failed ingest also failed: {}", cleanup);
                    }
                }
                return Err(e);
            }
            written.extend(batch.iter().map(|p| p.id));
        }

        Ok(document_id)
    }

    async fn upsert_with_retry(&self, batch: &[ChunkPoint]) -> Result<()> {
        let retries = self.settings.upsert_retries;
        let mut attempt = 0;
        loop {
            match self.index.upsert(batch.to_vec()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!(
                        "Upsert of {} points failed (attempt {}/{}): {}",
                        batch.len(),
                        attempt,
                        retries + 1,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        Ok(self
            .list_documents()
            .await?
            .into_iter()
            .find(|d| d.content_hash.as_deref() == Some(content_hash)))
    }

    /// One entry per document, in the order the index returns first chunks
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let first_chunks = self.index.scroll(&PointFilter::first_chunks(), None).await?;

        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        for chunk in first_chunks {
            let payload = chunk.payload;
            if !seen.insert(payload.document_id.clone()) {
                continue;
            }
            documents.push(Document {
                id: payload.document_id,
                filename: payload.filename,
                upload_timestamp: payload.upload_timestamp,
                full_text: payload.document_text.unwrap_or_default(),
                content_hash: payload.content_hash,
            });
        }

        debug!("Found {} documents", documents.len());
        Ok(documents)
    }

    /// Look up a single document by id
    pub async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let filter = PointFilter {
            chunk_index: Some(0),
            ..PointFilter::document(document_id)
        };
        let first = self.index.scroll(&filter, Some(1)).await?;
        Ok(first.into_iter().next().map(|chunk| Document {
            id: chunk.payload.document_id,
            filename: chunk.payload.filename,
            upload_timestamp: chunk.payload.upload_timestamp,
            full_text: chunk.payload.document_text.unwrap_or_default(),
            content_hash: chunk.payload.content_hash,
        }))
    }

    /// Full text stored on the first chunk; empty when the document is unknown
    pub async fn get_full_text(&self, document_id: &str) -> Result<String> {
        Ok(self
            .get_document(document_id)
            .await?
            .map(|d| d.full_text)
            .unwrap_or_default())
    }

    /// Id of the most recent upload named `filename`.
    ///
    /// Upload times are compared as instants, so uploads made under different
    /// UTC offsets still order correctly.
    pub async fn latest_document_id(&self, filename: &str) -> Result<Option<String>> {
        let filter = PointFilter {
            chunk_index: Some(0),
            ..PointFilter::filename(filename)
        };
        let first_chunks = self.index.scroll(&filter, None).await?;

        Ok(first_chunks
            .into_iter()
            .map(|c| c.payload)
            .max_by_key(|p| {
                (
                    DateTime::parse_from_rfc3339(&p.upload_timestamp).ok(),
                    p.upload_timestamp.clone(),
                )
            })
            .map(|p| p.document_id))
    }

    /// Chunk payloads for `filename`, sorted by index.
    ///
    /// When several uploads share the filename, the most recent upload wins.
    pub async fn chunks_for_filename(&self, filename: &str) -> Result<Vec<ChunkPayload>> {
        let Some(latest) = self.latest_document_id(filename).await? else {
            return Ok(Vec::new());
        };

        let mut payloads: Vec<ChunkPayload> = self
            .index
            .scroll(&PointFilter::document(latest), None)
            .await?
            .into_iter()
            .map(|c| c.payload)
            .collect();
        payloads.sort_by_key(|p| p.chunk_index);
        payloads.dedup_by_key(|p| p.chunk_index);
        Ok(payloads)
    }

    /// Chunk texts for `filename` in ascending index order
    pub async fn get_chunks(&self, filename: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks_for_filename(filename)
            .await?
            .into_iter()
            .map(|p| p.chunk_text)
            .collect())
    }

    /// Delete every chunk of the given documents, returning the points removed
    pub async fn delete_documents(&self, document_ids: &[String]) -> Result<usize> {
        if document_ids.is_empty() {
            return Ok(0);
        }

        let mut point_ids = Vec::new();
        for document_id in document_ids {
            let chunks = self
                .index
                .scroll(&PointFilter::document(document_id.as_str()), None)
                .await?;
            point_ids.extend(chunks.into_iter().map(|c| c.id));
        }

        self.index.delete(&point_ids).await?;
        info!(
            "Deleted {} chunks across {} documents",
            point_ids.len(),
            document_ids.len()
        );
        Ok(point_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IndexedChunk, MemoryIndex, SearchResult};
    use crate::testing::KeywordEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings() -> ChunkStoreSettings {
        let mut settings = ChunkStoreSettings::from_config(&Config::default()).unwrap();
        settings.max_chars = 40;
        settings.upsert_batch_size = 2;
        settings.upsert_retries = 1;
        settings.max_document_chars = 1000;
        settings
    }

    fn memory_store() -> (ChunkStore, Arc<MemoryIndex>) {
        let index = Arc::new(MemoryIndex::new());
        let store = ChunkStore::new(index.clone(), Arc::new(KeywordEmbedder), settings());
        (store, index)
    }

    /// Fails the first `failures` upserts, then delegates
    struct FlakyIndex {
        inner: MemoryIndex,
        failures: AtomicUsize,
        fail_after: usize,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn ensure_ready(&self) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<()> {
            let call = self.upserts.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_after && self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Qdrant("transient".to_string()));
            }
            self.inner.upsert(points).await
        }

        async fn scroll(
            &self,
            filter: &PointFilter,
            limit: Option<usize>,
        ) -> Result<Vec<IndexedChunk>> {
            self.inner.scroll(filter, limit).await
        }

        async fn delete(&self, ids: &[Uuid]) -> Result<()> {
            self.inner.delete(ids).await
        }

        async fn search(
            &self,
            vector: Vec<f32>,
            k: usize,
            filter: &PointFilter,
        ) -> Result<Vec<SearchResult>> {
            self.inner.search(vector, k, filter).await
        }
    }

    const TEXT: &str = "Paris is the capital of France. \
        Berlin is the capital of Germany. \
        Madrid is the capital of Spain.";

    #[tokio::test]
    async fn test_ingest_then_full_text_round_trip() {
        let (store, index) = memory_store();
        let id = store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap();

        assert!(index.len().await >= 3);
        assert_eq!(store.get_full_text(&id.to_string()).await.unwrap(), TEXT);
        assert_eq!(store.get_full_text("missing").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_oversized_document_writes_nothing() {
        let (store, index) = memory_store();
        let text = "a".repeat(1001);

        let err = store
            .ingest(&text, "big.txt", IngestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SizeLimitExceeded { len: 1001, max: 1000 }));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_blank_document_rejected() {
        let (store, _) = memory_store();
        let err = store
            .ingest("  \n ", "blank.txt", IngestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[tokio::test]
    async fn test_chunks_ordered_and_latest_upload_wins() {
        let (store, _) = memory_store();
        store
            .ingest("old text that should not be returned", "notes.txt", IngestOptions::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store
            .ingest(TEXT, "notes.txt", IngestOptions::default())
            .await
            .unwrap();

        let payloads = store.chunks_for_filename("notes.txt").await.unwrap();
        assert!(payloads.len() >= 3);
        assert!(payloads.windows(2).all(|w| w[0].chunk_index < w[1].chunk_index));

        let joined: String = store.get_chunks("notes.txt").await.unwrap().concat();
        assert_eq!(joined, TEXT);
        assert!(store.get_chunks("other.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_upload_compared_as_instants() {
        let index = Arc::new(MemoryIndex::new());
        let store_in = |hours: i32| {
            let mut settings = settings();
            settings.offset = FixedOffset::east_opt(hours * 3600).unwrap();
            ChunkStore::new(index.clone(), Arc::new(KeywordEmbedder), settings)
        };

        // +14:00 renders a later wall-clock time than the -12:00 upload that follows
        let old = store_in(14)
            .ingest("old text", "notes.txt", IngestOptions::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let store = store_in(-12);
        let new = store
            .ingest(TEXT, "notes.txt", IngestOptions::default())
            .await
            .unwrap();

        assert_ne!(old, new);
        assert_eq!(
            store.latest_document_id("notes.txt").await.unwrap(),
            Some(new.to_string())
        );
        assert_eq!(store.get_chunks("notes.txt").await.unwrap().concat(), TEXT);
        assert_eq!(store.latest_document_id("other.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_and_delete_documents() {
        let (store, index) = memory_store();
        let a = store
            .ingest(TEXT, "a.txt", IngestOptions::default())
            .await
            .unwrap();
        let b = store
            .ingest("Short note.", "b.txt", IngestOptions::default())
            .await
            .unwrap();

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "a.txt");
        assert_eq!(docs[0].full_text, TEXT);

        assert_eq!(store.delete_documents(&[]).await.unwrap(), 0);
        store.delete_documents(&[a.to_string()]).await.unwrap();

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, b.to_string());
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_transient_upsert_failure_is_retried() {
        let index = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            failures: AtomicUsize::new(1),
            fail_after: 1,
            upserts: AtomicUsize::new(0),
        });
        let store = ChunkStore::new(index.clone(), Arc::new(KeywordEmbedder), settings());

        let id = store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap();

        assert_eq!(store.get_full_text(&id.to_string()).await.unwrap(), TEXT);
        let joined: String = store.get_chunks("capitals.txt").await.unwrap().concat();
        assert_eq!(joined, TEXT);
    }

    #[tokio::test]
    async fn test_persistent_upsert_failure_cleans_up() {
        let index = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            failures: AtomicUsize::new(usize::MAX),
            fail_after: 1,
            upserts: AtomicUsize::new(0),
        });
        let store = ChunkStore::new(index.clone(), Arc::new(KeywordEmbedder), settings());

        let err = store
            .ingest(TEXT, "capitals.txt", IngestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Qdrant(_)));
        assert!(index.inner.is_empty().await);
    }
}
