//! Documentation retrieval for the question branch.
//!
//! Documents live in SQLite next to the conversation log, each with
//! an embedding vector. Retrieval embeds the query and ranks every
//! stored document by cosine similarity.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::info;

use crate::capabilities::ContextRetriever;

/// Documents returned per query.
const TOP_K: usize = 3;

/// Text embedding capability, implemented by the LLM client.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct DocStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS docs (
                doc_id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                embedding TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace a document and its embedding.
    pub async fn upsert(&self, doc_id: &str, body: &str, embedding: &[f32]) -> Result<()> {
        let conn = self.conn.clone();
        let doc_id = doc_id.to_string();
        let body = body.to_string();
        let encoded = serde_json::to_string(embedding)?;

        let stored_id = doc_id.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock().map_err(|_| anyhow!("Doc store lock poisoned"))?;
            conn.execute(
                "INSERT OR REPLACE INTO docs (doc_id, body, embedding) VALUES (?1, ?2, ?3)",
                params![doc_id, body, encoded],
            )?;
            Ok(())
        })
        .await??;
        info!("Stored doc {stored_id}");
        Ok(())
    }

    /// Bodies of the best-matching documents, scored against every
    /// stored row.
    pub async fn top_matches(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.clone();
        let query_embedding = query_embedding.to_vec();

        let matches = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = conn.lock().map_err(|_| anyhow!("Doc store lock poisoned"))?;
            let mut stmt = conn.prepare("SELECT body, embedding FROM docs")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (body, encoded) = row?;
                let Ok(embedding) = serde_json::from_str::<Vec<f32>>(&encoded) else {
                    continue;
                };
                scored.push((cosine(&query_embedding, &embedding), body));
            }
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            Ok(scored.into_iter().take(limit).map(|(_, body)| body).collect())
        })
        .await??;
        Ok(matches)
    }
}

/// Retriever backed by the doc store plus an embedder.
pub struct RagRetriever {
    store: Arc<DocStore>,
    embedder: Arc<dyn Embedder>,
}

impl RagRetriever {
    pub fn new(store: Arc<DocStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl ContextRetriever for RagRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(query).await?;
        self.store.top_matches(&embedding, TOP_K).await
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_ranks_aligned_vectors_highest() {
        assert!(cosine(&[1.0, 0.0], &[1.0, 0.0]) > cosine(&[1.0, 0.0], &[0.5, 0.5]));
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn retrieval_returns_closest_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocStore::open(&dir.path().join("docs.db")).unwrap();

        store.upsert("a", "scaling deployments", &[1.0, 0.0]).await.unwrap();
        store.upsert("b", "networking basics", &[0.0, 1.0]).await.unwrap();
        store.upsert("c", "horizontal autoscaling", &[0.9, 0.1]).await.unwrap();

        let matches = store.top_matches(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0], "scaling deployments");
        assert_eq!(matches[1], "horizontal autoscaling");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocStore::open(&dir.path().join("docs.db")).unwrap();

        store.upsert("a", "old body", &[1.0]).await.unwrap();
        store.upsert("a", "new body", &[1.0]).await.unwrap();

        let matches = store.top_matches(&[1.0], 10).await.unwrap();
        assert_eq!(matches, vec!["new body".to_string()]);
    }
}
