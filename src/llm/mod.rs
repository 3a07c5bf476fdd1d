pub mod prompt;
pub mod rag;

pub use prompt::{PromptTemplate, DEFAULT_TEMPLATE};
pub use rag::{Answer, RagChain};
