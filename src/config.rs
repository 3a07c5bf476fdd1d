use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::database::index::DEFAULT_EMBED_BATCH_SIZE;
use crate::document::{TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};
use crate::llm::PromptTemplate;
use crate::providers::groq::groq::{DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL};
use crate::providers::jina::jina::{DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDINGS_URL};

pub const DEFAULT_DOCUMENT: &str = "data/User Manual_Acer_1.0_A_A.pdf";
pub const DEFAULT_PERSIST_DIR: &str = "vector_index";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_QDRANT_COLLECTION: &str = "documents";

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Local { persist_dir: PathBuf },
    Qdrant { url: String, collection: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub store: StoreConfig,
    pub document: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embed_batch_size: usize,
    pub prompt_template_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("JINA_API_KEY").ok_or_else(|| {
            RagError::Configuration(
                "Jina API key is required. Set the JINA_API_KEY environment variable.".to_string(),
            )
        })?;

        let embedding = EmbeddingConfig {
            api_key,
            api_url: get("JINA_API_URL").unwrap_or_else(|| DEFAULT_EMBEDDINGS_URL.to_string()),
            model: get("JINA_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        };

        let chat = ChatConfig {
            api_key: get("GROQ_API_KEY"),
            api_url: get("GROQ_API_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            temperature: parse_or(get("GROQ_TEMPERATURE"), "GROQ_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        };

        let store = match get("QDRANT_URL") {
            Some(url) => StoreConfig::Qdrant {
                url,
                collection: get("QDRANT_COLLECTION")
                    .unwrap_or_else(|| DEFAULT_QDRANT_COLLECTION.to_string()),
            },
            None => StoreConfig::Local {
                persist_dir: PathBuf::from(
                    get("RAG_PERSIST_DIR").unwrap_or_else(|| DEFAULT_PERSIST_DIR.to_string()),
                ),
            },
        };

        let top_k = parse_or(get("RAG_TOP_K"), "RAG_TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(RagError::Configuration("RAG_TOP_K must be at least 1".to_string()));
        }

        Ok(Self {
            embedding,
            chat,
            store,
            document: PathBuf::from(get("RAG_DOCUMENT").unwrap_or_else(|| DEFAULT_DOCUMENT.to_string())),
            chunk_size: parse_or(get("RAG_CHUNK_SIZE"), "RAG_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_or(get("RAG_CHUNK_OVERLAP"), "RAG_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            top_k,
            embed_batch_size: parse_or(
                get("RAG_EMBED_BATCH_SIZE"),
                "RAG_EMBED_BATCH_SIZE",
                DEFAULT_EMBED_BATCH_SIZE,
            )?,
            prompt_template_file: get("RAG_PROMPT_TEMPLATE_FILE").map(PathBuf::from),
        })
    }

    /// Reads and parses the configured template file, or returns the
    /// built-in template. Every failure is a configuration error.
    pub async fn prompt_template(&self) -> Result<PromptTemplate> {
        let Some(path) = &self.prompt_template_file else {
            return Ok(PromptTemplate::default());
        };
        let template = tokio::fs::read_to_string(path).await.map_err(|e| {
            RagError::Configuration(format!(
                "Failed to read prompt template {}: {}",
                path.display(),
                e
            ))
        })?;
        PromptTemplate::parse(&template)
    }

    pub fn text_splitter(&self) -> Result<TextSplitter> {
        TextSplitter::new(self.chunk_size, self.chunk_overlap)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.parse().map_err(|_| {
            RagError::Configuration(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}
