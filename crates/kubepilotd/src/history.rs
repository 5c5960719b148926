//! Conversation history store.
//!
//! Append-only SQLite log of (query, response) pairs. Writes are
//! serialized here, behind one connection; callers never coordinate.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};

use kubepilot_common::ConversationRecord;

use crate::capabilities::HistoryStore;

pub struct SqliteHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistory {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_query TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn store(&self, query: &str, response: &str) -> Result<()> {
        let conn = self.conn.clone();
        let query = query.to_string();
        let response = response.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("History store lock poisoned"))?;
            conn.execute(
                "INSERT INTO conversations (user_query, bot_response, timestamp)
                 VALUES (?1, ?2, ?3)",
                params![query, response, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn history(&self) -> Result<Vec<ConversationRecord>> {
        let conn = self.conn.clone();

        let records = tokio::task::spawn_blocking(move || -> Result<Vec<ConversationRecord>> {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("History store lock poisoned"))?;
            let mut stmt = conn.prepare(
                "SELECT user_query, bot_response, timestamp
                 FROM conversations ORDER BY id DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ConversationRecord {
                    query: row.get(0)?,
                    response: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await??;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_lists_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistory::open(&dir.path().join("history.db")).unwrap();

        store.store("first question", "first answer").await.unwrap();
        store.store("second question", "second answer").await.unwrap();

        let records = store.history().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "second question");
        assert_eq!(records[1].response, "first answer");
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistory::open(&dir.path().join("history.db")).unwrap();
        assert!(store.history().await.unwrap().is_empty());
    }
}
