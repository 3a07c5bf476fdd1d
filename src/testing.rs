//! Shared fakes for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::database::store::VectorStore;
use crate::document::{Chunk, ScoredChunk, SourceSpan};
use crate::error::{RagError, Result};
use crate::providers::traits::{CompletionProvider, EmbeddingProvider};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Embeds by counting a few letters, so related texts land close together.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<String>>>,
    pub fail_with_status: Option<u16>,
}

impl FakeEmbedder {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        ['a', 'e', 'o', 's']
            .iter()
            .map(|c| lower.matches(*c).count() as f32 + 0.1)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(texts.to_vec());
        if let Some(status) = self.fail_with_status {
            return Err(RagError::EmbeddingService {
                status,
                body: "rejected".to_string(),
            });
        }
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// Returns canned results and records what it was asked.
#[derive(Default)]
pub struct FakeStore {
    pub results: Vec<ScoredChunk>,
    pub added: Mutex<Vec<(Chunk, Vec<f32>)>>,
    pub searches: Mutex<Vec<(Vec<f32>, usize)>>,
}

impl FakeStore {
    pub fn with_results(texts: &[(&str, f32)]) -> Self {
        Self {
            results: texts
                .iter()
                .map(|(text, score)| ScoredChunk {
                    chunk: chunk(text),
                    score: *score,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn add(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<Vec<String>> {
        let mut added = self.added.lock().unwrap();
        let start = added.len();
        for (chunk, vector) in chunks.iter().cloned().zip(vectors) {
            added.push((chunk, vector));
        }
        Ok((start..added.len()).map(|i| i.to_string()).collect())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        self.searches.lock().unwrap().push((query_vector.to_vec(), k));
        Ok(self.results.iter().take(k).cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.added.lock().unwrap().len())
    }
}

/// Echoes the prompt it receives, or fails when `fail` is set.
#[derive(Default)]
pub struct FakeLlm {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl CompletionProvider for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RagError::Generation("model unavailable".to_string()));
        }
        Ok(format!("echo: {}", prompt.len()))
    }

    fn model_name(&self) -> &str {
        "fake-llm"
    }
}

pub fn chunk(text: &str) -> Chunk {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), serde_json::json!("test.txt"));
    Chunk {
        text: text.to_string(),
        metadata,
        span: SourceSpan {
            start: 0,
            end: text.len(),
        },
    }
}
