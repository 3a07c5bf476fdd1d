pub mod groq;
pub mod jina;
pub mod traits;

pub use groq::groq::GroqProvider;
pub use jina::jina::JinaEmbedder;
pub use traits::{CompletionProvider, EmbeddingProvider};
