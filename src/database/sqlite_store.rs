use async_trait::async_trait;
use tokio_rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use log::info;
use uuid::Uuid;

use super::store::{cosine_similarity, StoredMetadata, VectorStore};
use crate::document::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};

pub const INDEX_FILE_NAME: &str = "index.sqlite3";

/// Vector index kept in a SQLite file inside a persist directory.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Connection>,
}

type StoredRow = (String, String, String, String);

impl SqliteStore {
    /// Creates `dir` if needed and opens the index file inside it.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(INDEX_FILE_NAME);
        let conn = Connection::open(&path)
            .await
            .map_err(|e| RagError::VectorStore(format!("Failed to open {}: {}", path.display(), e)))?;

        let store = Self {
            conn: Arc::new(conn),
        };
        store.initialize().await?;
        info!("Vector index opened at {}", path.display());
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS chunks (
                        seq INTEGER PRIMARY KEY AUTOINCREMENT,
                        id TEXT UNIQUE NOT NULL,
                        text TEXT NOT NULL,
                        metadata TEXT NOT NULL,
                        embedding TEXT NOT NULL
                    );"
                )?;
                Ok(())
            })
            .await
            .map_err(store_error)
    }

    async fn load_rows(&self) -> Result<Vec<StoredRow>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, text, metadata, embedding FROM chunks ORDER BY seq"
                )?;

                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?;

                let mut stored = Vec::new();
                for row in rows {
                    stored.push(row?);
                }

                Ok(stored)
            })
            .await
            .map_err(store_error)
    }
}

fn store_error(e: tokio_rusqlite::Error) -> RagError {
    RagError::VectorStore(e.to_string())
}

fn decode_row((_, text, metadata, embedding): StoredRow) -> Result<(Chunk, Vec<f32>)> {
    let stored: StoredMetadata = serde_json::from_str(&metadata)?;
    let vector: Vec<f32> = serde_json::from_str(&embedding)?;
    Ok((stored.into_chunk(text), vector))
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<Vec<String>> {
        if chunks.len() != vectors.len() {
            return Err(RagError::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let mut rows = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(&vectors) {
            let metadata = serde_json::to_string(&StoredMetadata::of(chunk))?;
            rows.push([
                Uuid::new_v4().to_string(),
                chunk.text.clone(),
                metadata,
                serde_json::to_string(vector)?,
            ]);
        }
        let ids: Vec<String> = rows.iter().map(|row| row[0].clone()).collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO chunks (id, text, metadata, embedding) VALUES (?1, ?2, ?3, ?4)"
                    )?;
                    for row in &rows {
                        stmt.execute([&row[0], &row[1], &row[2], &row[3]])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(store_error)?;

        Ok(ids)
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let mut scored = Vec::new();
        for row in self.load_rows().await? {
            let (chunk, vector) = decode_row(row)?;
            if vector.len() != query_vector.len() {
                return Err(RagError::VectorStore(format!(
                    "Query has {} dimensions but the index holds {}-dimensional vectors",
                    query_vector.len(),
                    vector.len()
                )));
            }
            scored.push(ScoredChunk {
                score: cosine_similarity(query_vector, &vector),
                chunk,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        let count = self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(store_error)?;
        Ok(count as usize)
    }
}
