use async_trait::async_trait;
use crate::document::{Chunk, ScoredChunk, SourceSpan};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Persists chunks with their vectors and answers nearest-neighbour queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores one vector per chunk and returns the new point ids.
    /// Re-adding the same chunks grows the index.
    async fn add(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<Vec<String>>;

    /// Returns at most `k` chunks ordered by descending similarity.
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;
}

/// Chunk fields other than the text, as persisted by the store backends.
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredMetadata {
    metadata: HashMap<String, Value>,
    span: SourceSpan,
}

impl StoredMetadata {
    pub(crate) fn of(chunk: &Chunk) -> Self {
        Self {
            metadata: chunk.metadata.clone(),
            span: chunk.span,
        }
    }

    pub(crate) fn into_chunk(self, text: String) -> Chunk {
        Chunk {
            text,
            metadata: self.metadata,
            span: self.span,
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
