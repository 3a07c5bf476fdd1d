use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Embedding service error: Status {status}, Body: {body}")]
    EmbeddingService { status: u16, body: String },
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Vector store error: {0}")]
    VectorStore(String),
    #[error("Document error: {0}")]
    Document(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
