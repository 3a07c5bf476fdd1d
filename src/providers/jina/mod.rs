pub mod jina;
