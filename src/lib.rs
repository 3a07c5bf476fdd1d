pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod llm;
pub mod providers;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use config::AppConfig;
pub use error::{RagError, Result};
pub use llm::{Answer, RagChain};
