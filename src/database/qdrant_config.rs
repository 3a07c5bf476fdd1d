use qdrant_client::{Qdrant, config::QdrantConfig};
use std::time::Duration;
use crate::error::{RagError, Result};

/// Rewrites a REST URL (port 6333) to the gRPC endpoint the client speaks.
pub fn grpc_url(url: &str) -> String {
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url)
    } else {
        url
    }
    .trim_end_matches('/')
    .to_string();

    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url
    };

    format!("http://{}", grpc_url)
}

pub async fn create_qdrant_client(url: &str) -> Result<Qdrant> {
    let url_with_scheme = grpc_url(url);
    log::info!("Attempting to connect to Qdrant with URL: {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config)
        .map_err(|e| RagError::VectorStore(format!("Failed to create Qdrant client: {}", e)))?;

    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Connection test failed: {}", e);
            Err(RagError::VectorStore(format!("Failed to connect to Qdrant: {}", e)))
        }
    }
}
