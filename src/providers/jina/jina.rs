//! Jina embeddings API client.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::providers::traits::EmbeddingProvider;

pub const DEFAULT_EMBEDDINGS_URL: &str = "https://api.jina.ai/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "jina-clip-v2";

#[derive(Clone)]
pub struct JinaEmbedder {
    api_key: String,
    client: Client,
    url: String,
    model: String,
}

impl JinaEmbedder {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_EMBEDDINGS_URL, DEFAULT_EMBEDDING_MODEL)
    }

    pub fn with_endpoint(
        api_key: String,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::Configuration(
                "Jina API key is required. Set the JINA_API_KEY environment variable.".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            client: Client::new(),
            url: url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for JinaEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RagError::InvalidInput(
                "embed_texts requires at least one text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts.iter().map(|text| TextInput { text }).collect(),
        };

        debug!("Requesting {} embeddings from {}", texts.len(), self.url);
        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::EmbeddingService {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            RagError::MalformedResponse(format!("Invalid embedding response ({}): {}", e, body))
        })?;

        collect_vectors(parsed, texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn collect_vectors(mut parsed: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if parsed.data.len() != expected {
        return Err(RagError::MalformedResponse(format!(
            "Embedding service returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }

    if parsed.data.iter().all(|entry| entry.index.is_some()) {
        parsed.data.sort_by_key(|entry| entry.index);
        if let Some((position, entry)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, entry)| entry.index != Some(*position))
        {
            return Err(RagError::MalformedResponse(format!(
                "Embedding indexes must cover 0..{}, found {:?} at position {}",
                expected, entry.index, position
            )));
        }
    }

    let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|entry| entry.embedding).collect();

    let dimension = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(RagError::MalformedResponse(format!(
            "Embedding dimensions differ within one batch: {} vs {}",
            dimension,
            bad.len()
        )));
    }

    Ok(vectors)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<TextInput<'a>>,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}
