//! Conversation memory collaborator.
//!
//! The engine only needs two operations: persist a finished answer and pull
//! back a few prior turns relevant to a new query. [`SqliteMemory`] keeps
//! turns in the cache database and ranks them by keyword overlap;
//! [`NoopMemory`] disables the feature.

use crate::cache::CacheDb;
use crate::query::fingerprint;
use crate::Error;
use std::collections::HashSet;
use tokio_rusqlite::params;

/// How many recent turns are scanned when looking for relevant ones.
const SCAN_WINDOW: i64 = 200;

/// Store and recall prior conversation turns.
#[async_trait::async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Persist one answered query.
    async fn store(&self, query: &str, answer: &str, metadata: &serde_json::Value) -> Result<(), Error>;

    /// Up to `n` prior turns relevant to `query`, most relevant first.
    async fn retrieve_relevant(&self, query: &str, n: usize) -> Result<Vec<String>, Error>;
}

/// Memory that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMemory;

#[async_trait::async_trait]
impl ConversationMemory for NoopMemory {
    async fn store(&self, _query: &str, _answer: &str, _metadata: &serde_json::Value) -> Result<(), Error> {
        Ok(())
    }

    async fn retrieve_relevant(&self, _query: &str, _n: usize) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }
}

/// SQLite-backed memory sharing the cache database.
#[derive(Debug, Clone)]
pub struct SqliteMemory {
    db: CacheDb,
}

impl SqliteMemory {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }
}

/// Content words of a fingerprint; short tokens carry little signal.
fn keywords(text: &str) -> HashSet<String> {
    fingerprint(text)
        .split(' ')
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl ConversationMemory for SqliteMemory {
    async fn store(&self, query: &str, answer: &str, metadata: &serde_json::Value) -> Result<(), Error> {
        let query = query.trim().to_string();
        let fp = fingerprint(&query);
        let answer = answer.to_string();
        let metadata_json = metadata.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO conversations (query, fingerprint, answer, metadata_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![query, fp, answer, metadata_json, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn retrieve_relevant(&self, query: &str, n: usize) -> Result<Vec<String>, Error> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let wanted = keywords(query);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .db
            .conn
            .call(|conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT query, answer FROM conversations ORDER BY id DESC LIMIT ?1")?;
                let rows = stmt
                    .query_map(params![SCAN_WINDOW], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut scored: Vec<(usize, usize, String)> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(recency, (q, a))| {
                let overlap = keywords(&q).intersection(&wanted).count();
                (overlap > 0).then(|| (overlap, recency, format!("User: {q}\nAssistant: {a}")))
            })
            .collect();

        // Most overlap first, newer turns break ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored.into_iter().take(n).map(|(_, _, turn)| turn).collect())
    }
}
