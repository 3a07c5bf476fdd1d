use log::{debug, info};
use std::sync::Arc;

use super::store::VectorStore;
use crate::document::{Chunk, ScoredChunk};
use crate::error::Result;
use crate::providers::traits::EmbeddingProvider;

pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Binds one embedder to one store so that ingestion and queries share
/// a vector space.
#[derive(Clone)]
pub struct DocumentIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embeds and stores `chunks`, one embedding request per batch.
    /// `on_batch` is called with the running total after each batch.
    pub async fn add_chunks<F>(&self, chunks: &[Chunk], mut on_batch: F) -> Result<Vec<String>>
    where
        F: FnMut(usize),
    {
        let mut ids = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            ids.extend(self.store.add(batch, vectors).await?);
            on_batch(ids.len());
        }
        info!(
            "Indexed {} chunk(s) with {}",
            ids.len(),
            self.embedder.model_name()
        );
        Ok(ids)
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let results = self.store.search(&query_vector, k).await?;
        debug!("Query matched {} chunk(s)", results.len());
        Ok(results)
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    pub fn as_retriever(&self, k: usize) -> Retriever {
        Retriever {
            index: self.clone(),
            k,
        }
    }
}

/// Fixed-`k` view over a [`DocumentIndex`].
#[derive(Clone)]
pub struct Retriever {
    index: DocumentIndex,
    k: usize,
}

impl Retriever {
    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.index.similarity_search(query, self.k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chunk, FakeEmbedder, FakeStore};

    #[tokio::test]
    async fn test_add_chunks_batches_requests() {
        let embedder = Arc::new(FakeEmbedder::default());
        let store = Arc::new(FakeStore::default());
        let index = DocumentIndex::new(embedder.clone(), store.clone()).with_batch_size(2);

        let chunks: Vec<Chunk> = ["one", "two", "three", "four", "five"]
            .iter()
            .map(|t| chunk(t))
            .collect();
        let mut progress = Vec::new();
        let ids = index.add_chunks(&chunks, |done| progress.push(done)).await.unwrap();

        assert_eq!(ids.len(), 5);
        assert_eq!(embedder.calls(), 3);
        assert_eq!(progress, vec![2, 4, 5]);
        let added = store.added.lock().unwrap();
        assert_eq!(added[4].0.text, "five");
        assert_eq!(added[4].1, FakeEmbedder::vector_for("five"));
    }

    #[tokio::test]
    async fn test_search_uses_same_embedder() {
        let embedder = Arc::new(FakeEmbedder::default());
        let store = Arc::new(FakeStore::with_results(&[("a", 0.9), ("b", 0.5), ("c", 0.1)]));
        let retriever = DocumentIndex::new(embedder.clone(), store.clone()).as_retriever(2);

        let results = retriever.retrieve("seashore").await.unwrap();

        assert_eq!(results.len(), 2);
        let searches = store.searches.lock().unwrap();
        assert_eq!(searches[0].0, FakeEmbedder::vector_for("seashore"));
        assert_eq!(searches[0].1, 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_stops_ingestion() {
        let embedder = Arc::new(FakeEmbedder::failing(401));
        let store = Arc::new(FakeStore::default());
        let index = DocumentIndex::new(embedder, store.clone());

        assert!(index.add_chunks(&[chunk("x")], |_| {}).await.is_err());
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
