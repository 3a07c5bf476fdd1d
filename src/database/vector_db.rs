use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        Distance, PointStruct, SearchPoints,
        VectorParams, Value,
        value::Kind,
        with_payload_selector::SelectorOptions, WithPayloadSelector,
        point_id::PointIdOptions,
        PointId,
        CreateCollection, VectorsConfig,
        UpsertPoints, CountPoints,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::qdrant_config::create_qdrant_client;
use super::store::{StoredMetadata, VectorStore};
use crate::document::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};

/// Vector index backed by a Qdrant collection.
#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
    collection: String,
    collection_ready: Arc<Mutex<bool>>,
}

impl QdrantStore {
    pub async fn new(url: &str, collection: &str) -> Result<Self> {
        let client = create_qdrant_client(url).await?;
        Ok(Self {
            client: Arc::new(client),
            collection: collection.to_string(),
            collection_ready: Arc::new(Mutex::new(false)),
        })
    }

    async fn collection_exists(&self) -> Result<bool> {
        let response = self.client.list_collections()
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(response.collections.iter().any(|c| c.name == self.collection))
    }

    /// Whether the collection exists. A positive answer is remembered so
    /// later calls skip the listing round trip.
    async fn collection_known(&self) -> Result<bool> {
        let mut ready = self.collection_ready.lock().await;
        if *ready {
            return Ok(true);
        }
        if self.collection_exists().await? {
            *ready = true;
        }
        Ok(*ready)
    }

    /// Creates the collection on first use, sized from the first vector.
    async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
        let mut ready = self.collection_ready.lock().await;
        if *ready {
            return Ok(());
        }
        if self.collection_exists().await? {
            *ready = true;
            return Ok(());
        }

        let vectors_config = VectorParams {
            size: vector_size,
            distance: Distance::Cosine.into(),
            ..Default::default()
        };

        let vectors_config = VectorsConfig {
            config: Some(qdrant_client::qdrant::vectors_config::Config::Params(vectors_config)),
        };

        let create_collection = CreateCollection {
            collection_name: self.collection.clone(),
            vectors_config: Some(vectors_config),
            ..Default::default()
        };

        match self.client.create_collection(create_collection).await {
            Ok(_) => {}
            Err(e) if e.to_string().contains("AlreadyExists") || e.to_string().contains("already exists") => {
                log::info!("Collection {} already exists, skipping creation", self.collection);
            }
            Err(e) => return Err(RagError::VectorStore(e.to_string())),
        }

        *ready = true;
        Ok(())
    }
}

fn string_value(value: Option<&Value>) -> Option<String> {
    match value.and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<Vec<String>> {
        if chunks.len() != vectors.len() {
            return Err(RagError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let Some(first) = vectors.first() else {
            return Ok(Vec::new());
        };
        self.ensure_collection(first.len() as u64).await?;

        let mut ids = Vec::with_capacity(chunks.len());
        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let point_id = Uuid::new_v4().to_string();

            let mut payload: HashMap<String, Value> = HashMap::new();
            payload.insert("text".to_string(), Value::from(chunk.text.clone()));
            payload.insert(
                "metadata".to_string(),
                Value::from(serde_json::to_string(&StoredMetadata::of(chunk))?),
            );

            points.push(PointStruct {
                id: Some(PointId {
                    point_id_options: Some(PointIdOptions::Uuid(point_id.clone()))
                }),
                vectors: Some(vector.into()),
                payload,
            });
            ids.push(point_id);
        }

        let upsert_points = UpsertPoints {
            collection_name: self.collection.clone(),
            wait: Some(true),
            points,
            ..Default::default()
        };

        self.client.upsert_points(upsert_points)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(ids)
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.collection_known().await? {
            log::debug!("Collection {} does not exist yet, nothing to search", self.collection);
            return Ok(Vec::new());
        }

        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: query_vector.to_vec(),
            limit: k as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self.client.search_points(request)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        let mut scored = Vec::with_capacity(results.result.len());
        for point in results.result {
            let text = string_value(point.payload.get("text"));
            let metadata = string_value(point.payload.get("metadata"));
            let (Some(text), Some(metadata)) = (text, metadata) else {
                log::warn!("Skipping point without text payload in {}", self.collection);
                continue;
            };
            let stored: StoredMetadata = serde_json::from_str(&metadata)?;
            scored.push(ScoredChunk {
                chunk: stored.into_chunk(text),
                score: point.score,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        if !self.collection_known().await? {
            return Ok(0);
        }
        let request = CountPoints {
            collection_name: self.collection.clone(),
            exact: Some(true),
            ..Default::default()
        };
        let response = self.client.count(request)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0) as usize)
    }
}
