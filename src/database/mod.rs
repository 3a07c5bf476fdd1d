pub mod index;
pub mod qdrant_config;
pub mod sqlite_store;
pub mod store;
pub mod vector_db;

pub use index::{DocumentIndex, Retriever};
pub use sqlite_store::SqliteStore;
pub use store::VectorStore;
pub use vector_db::QdrantStore;
