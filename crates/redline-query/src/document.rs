//! Document store: chunk, embed, persist and retrieve per document key.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use redline_core::{
    ChunkStore, Chunker, Embedder, PendingChunk, RedlineError, ReindexPolicy, Result, StoreStats,
};

/// Options for [`DocumentStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentStoreOptions {
    /// What to do when a key that already has chunks is indexed again.
    pub reindex: ReindexPolicy,
}

/// Indexes document text and answers similarity queries scoped to one
/// document key.
///
/// Constructed explicitly and shared by reference; there is no process-wide
/// handle.
pub struct DocumentStore {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Arc<dyn Chunker>,
    options: DocumentStoreOptions,
}

/// Anything the embedder reports is a store outage from the caller's view.
fn as_store_error(e: RedlineError) -> RedlineError {
    if e.is_store_unavailable() {
        e
    } else {
        RedlineError::store_unavailable(e.to_string())
    }
}

impl DocumentStore {
    /// Wire up a document store. The backing collection is created lazily.
    pub fn open(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        chunker: Arc<dyn Chunker>,
        options: DocumentStoreOptions,
    ) -> Self {
        info!(
            "Document store ready (dimension={}, reindex={:?})",
            embedder.dimension(),
            options.reindex
        );
        Self {
            store,
            embedder,
            chunker,
            options,
        }
    }

    /// Chunk, embed and store `text` under `filename`.
    ///
    /// Returns the number of chunks written. Empty text writes nothing.
    pub async fn index(&self, filename: &str, text: &str) -> Result<usize> {
        let start = Instant::now();

        let chunks = self.chunker.split(text);
        if chunks.is_empty() {
            debug!("Nothing to index for {}", filename);
            return Ok(0);
        }

        self.store.ensure_collection().await?;

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self
            .embedder
            .embed_documents(&texts)
            .await
            .map_err(as_store_error)?;

        if embeddings.len() != chunks.len() {
            return Err(RedlineError::store_unavailable(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let pending: Vec<PendingChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(content, embedding)| PendingChunk { content, embedding })
            .collect();
        let written = pending.len();

        let first = self
            .store
            .append_chunks(filename, pending, self.options.reindex)
            .await?;

        info!(
            "Indexed {} chunks for {} from index {} in {:?}",
            written,
            filename,
            first,
            start.elapsed()
        );

        Ok(written)
    }

    /// Up to `limit` chunk texts of `filename`, most similar to `query` first.
    ///
    /// Unknown keys and an empty corpus yield an empty vector.
    pub async fn search(&self, query: &str, filename: &str, limit: u32) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(as_store_error)?;

        let results = self.store.vector_search(&embedding, filename, limit).await?;

        debug!(
            "Search in {} returned {} chunks (limit {})",
            filename,
            results.len(),
            limit
        );

        Ok(results.into_iter().map(|r| r.content).collect())
    }

    /// Drop every chunk of every document.
    pub async fn reset(&self) -> Result<()> {
        self.store.reset().await?;
        info!("Document store reset");
        Ok(())
    }

    /// Document and chunk counts, optionally for one key.
    pub async fn stats(&self, filename: Option<&str>) -> Result<StoreStats> {
        self.store.stats(filename).await
    }

    /// Number of chunks stored for `filename`.
    pub async fn chunk_count(&self, filename: &str) -> Result<u32> {
        self.store.count_chunks(filename).await
    }

    /// End the store's lifecycle. Later calls fail with `StoreUnavailable`.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redline_chunk::SlidingWindowChunker;
    use redline_core::{ChunkRecord, ScoredChunk};
    use redline_embed::HashEmbedder;
    use redline_store::SqliteStore;

    fn document_store(reindex: ReindexPolicy) -> DocumentStore {
        DocumentStore::open(
            Arc::new(SqliteStore::open_memory().unwrap()),
            Arc::new(HashEmbedder::new()),
            Arc::new(SlidingWindowChunker::new()),
            DocumentStoreOptions { reindex },
        )
    }

    fn long_text(len: usize) -> String {
        "Landlord may enter the premises at any time without notice. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[tokio::test]
    async fn test_index_counts_chunks() {
        let store = document_store(ReindexPolicy::Append);
        let written = store.index("lease.pdf", &long_text(2500)).await.unwrap();
        assert_eq!(written, 3);
        assert_eq!(store.chunk_count("lease.pdf").await.unwrap(), 3);

        assert_eq!(store.index("empty.pdf", "").await.unwrap(), 0);
        assert_eq!(store.chunk_count("empty.pdf").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_is_isolated_per_filename() {
        let store = document_store(ReindexPolicy::Append);
        store
            .index("a.pdf", "Tenant forfeits security deposit on early exit.")
            .await
            .unwrap();
        store
            .index("b.pdf", "Security deposit is returned within 14 days.")
            .await
            .unwrap();

        let results = store.search("security deposit", "a.pdf", 5).await.unwrap();
        assert_eq!(results, vec!["Tenant forfeits security deposit on early exit."]);

        let results = store.search("security deposit", "b.pdf", 5).await.unwrap();
        assert_eq!(results, vec!["Security deposit is returned within 14 days."]);
    }

    #[tokio::test]
    async fn test_search_empty_store_and_unknown_key() {
        let store = document_store(ReindexPolicy::Append);
        assert!(store.search("anything", "x.pdf", 5).await.unwrap().is_empty());

        store.index("a.pdf", "some text").await.unwrap();
        assert!(store.search("some", "other.pdf", 5).await.unwrap().is_empty());
        assert!(store.search("some", "a.pdf", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_order() {
        let store = document_store(ReindexPolicy::Append);
        let mut text = String::new();
        text.push_str(&long_text(1600));
        text.push_str(&"Non-compete clause binds the employee for five years. ".repeat(20));
        store.index("c.pdf", &text).await.unwrap();

        let results = store.search("non-compete employee", "c.pdf", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].contains("Non-compete"));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = document_store(ReindexPolicy::Append);
        store.reset().await.unwrap();

        store.index("a.pdf", "clause one").await.unwrap();
        store.index("b.pdf", "clause two").await.unwrap();
        store.reset().await.unwrap();

        assert!(store.search("clause", "a.pdf", 5).await.unwrap().is_empty());
        assert_eq!(store.stats(None).await.unwrap().chunks, 0);

        // Usable again after a reset.
        store.index("a.pdf", "clause three").await.unwrap();
        assert_eq!(store.chunk_count("a.pdf").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reindex_append_doubles_chunks() {
        let store = document_store(ReindexPolicy::Append);
        let text = long_text(2500);
        store.index("lease.pdf", &text).await.unwrap();
        store.index("lease.pdf", &text).await.unwrap();

        assert_eq!(store.chunk_count("lease.pdf").await.unwrap(), 6);
        let stats = store.stats(Some("lease.pdf")).await.unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.chunks, 6);
    }

    #[tokio::test]
    async fn test_reindex_replace_keeps_count() {
        let store = document_store(ReindexPolicy::Replace);
        let text = long_text(2500);
        store.index("lease.pdf", &text).await.unwrap();
        store.index("lease.pdf", &text).await.unwrap();

        assert_eq!(store.chunk_count("lease.pdf").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let store = document_store(ReindexPolicy::Append);
        store.close().await.unwrap();

        let err = store.index("a.pdf", "text").await.unwrap_err();
        assert!(err.is_store_unavailable());
        let err = store.search("text", "a.pdf", 3).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    /// Hands control back to the runtime before every embedding call, so
    /// concurrent `index` calls interleave.
    struct YieldingEmbedder(HashEmbedder);

    #[async_trait]
    impl Embedder for YieldingEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            tokio::task::yield_now().await;
            self.0.embed_documents(texts).await
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            tokio::task::yield_now().await;
            self.0.embed_query(text).await
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }
    }

    fn yielding_store(reindex: ReindexPolicy) -> DocumentStore {
        DocumentStore::open(
            Arc::new(SqliteStore::open_memory().unwrap()),
            Arc::new(YieldingEmbedder(HashEmbedder::new())),
            Arc::new(SlidingWindowChunker::new()),
            DocumentStoreOptions { reindex },
        )
    }

    #[tokio::test]
    async fn test_concurrent_append_keeps_every_chunk() {
        let store = yielding_store(ReindexPolicy::Append);
        let first = long_text(2500);
        let second = long_text(3500);

        let (a, b) = tokio::join!(
            store.index("lease.pdf", &first),
            store.index("lease.pdf", &second)
        );
        let written = a.unwrap() + b.unwrap();
        assert_eq!(written, 7);
        assert_eq!(store.chunk_count("lease.pdf").await.unwrap() as usize, written);

        // A later append continues after both.
        store.index("lease.pdf", "one more clause").await.unwrap();
        assert_eq!(store.chunk_count("lease.pdf").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_concurrent_replace_leaves_one_copy() {
        let store = yielding_store(ReindexPolicy::Replace);
        let first = long_text(2500);
        let second = long_text(3500);

        let (a, b) = tokio::join!(
            store.index("lease.pdf", &first),
            store.index("lease.pdf", &second)
        );
        let counts = [a.unwrap(), b.unwrap()];
        let stored = store.chunk_count("lease.pdf").await.unwrap() as usize;
        assert!(counts.contains(&stored));
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_documents(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Err(RedlineError::internal("model not loaded"))
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RedlineError::internal("model not loaded"))
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct DownStore;

    #[async_trait]
    impl ChunkStore for DownStore {
        async fn ensure_collection(&self) -> Result<()> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn insert_chunks(&self, _chunks: &[ChunkRecord]) -> Result<()> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn append_chunks(
            &self,
            _filename: &str,
            _chunks: Vec<PendingChunk>,
            _policy: ReindexPolicy,
        ) -> Result<u32> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn count_chunks(&self, _filename: &str) -> Result<u32> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn delete_document(&self, _filename: &str) -> Result<u64> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn vector_search(
            &self,
            _embedding: &[f32],
            _filename: &str,
            _k: u32,
        ) -> Result<Vec<ScoredChunk>> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn reset(&self) -> Result<()> {
            Err(RedlineError::store_unavailable("connection refused"))
        }

        async fn stats(&self, _filename: Option<&str>) -> Result<StoreStats> {
            Err(RedlineError::store_unavailable("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_embedder_failure_is_store_unavailable() {
        let store = DocumentStore::open(
            Arc::new(SqliteStore::open_memory().unwrap()),
            Arc::new(FailingEmbedder),
            Arc::new(SlidingWindowChunker::new()),
            DocumentStoreOptions::default(),
        );

        let err = store.index("a.pdf", "text").await.unwrap_err();
        assert!(err.is_store_unavailable());
        let err = store.search("text", "a.pdf", 3).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_backend_failure_is_store_unavailable() {
        let store = DocumentStore::open(
            Arc::new(DownStore),
            Arc::new(HashEmbedder::new()),
            Arc::new(SlidingWindowChunker::new()),
            DocumentStoreOptions::default(),
        );

        assert!(store.index("a.pdf", "text").await.unwrap_err().is_store_unavailable());
        assert!(store.reset().await.unwrap_err().is_store_unavailable());
    }
}
