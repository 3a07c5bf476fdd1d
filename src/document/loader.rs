use super::Document;
use crate::error::{RagError, Result};
use log::info;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reads a PDF or UTF-8 text file into page documents.
pub struct DocumentLoader {
    path: PathBuf,
}

impl DocumentLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self) -> Result<Vec<Document>> {
        if !self.path.exists() {
            return Err(RagError::Document(format!(
                "File not found: {}",
                self.path.display()
            )));
        }

        let is_pdf = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        let pages = if is_pdf {
            self.load_pdf().await?
        } else {
            vec![tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                RagError::Document(format!("Failed to read {}: {}", self.path.display(), e))
            })?]
        };

        let source = self.path.to_string_lossy().to_string();
        let documents: Vec<Document> = pages
            .into_iter()
            .enumerate()
            .map(|(page, text)| {
                let mut metadata = HashMap::new();
                metadata.insert("source".to_string(), json!(source));
                metadata.insert("page".to_string(), json!(page));
                Document { text, metadata }
            })
            .collect();

        info!("Loaded {} page(s) from {}", documents.len(), source);
        Ok(documents)
    }

    /// One string per PDF page, blank pages included so page numbers
    /// stay aligned with the file.
    async fn load_pdf(&self) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(&self.path).await?;
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
            RagError::Document(format!("Failed to extract PDF text from {}: {}", self.path.display(), e))
        })
    }
}
