//! TTL cache entry operations.
//!
//! Validity is checked lazily on read: an entry is live iff
//! `now - created_at < ttl`. Expired rows stay on disk until overwritten or
//! purged, but are never returned.

use super::connection::CacheDb;
use super::hash::{CacheKey, CacheScope};
use crate::Error;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored row as read back from SQLite.
#[derive(Debug)]
struct StoredEntry {
    payload: String,
    created_at_ms: i64,
    ttl_ms: i64,
}

impl StoredEntry {
    fn is_live_at(&self, now_ms: i64) -> bool {
        self.ttl_ms > 0 && now_ms.saturating_sub(self.created_at_ms) < self.ttl_ms
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

impl CacheDb {
    /// Get a live payload by key.
    ///
    /// Returns `None` when the key is absent, expired, or its row is unreadable.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>, Error> {
        let key_hash = key.hash();
        let key_label = key.to_string();
        let entry = self
            .conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt =
                    conn.prepare("SELECT payload, created_at_ms, ttl_ms FROM cache_entries WHERE key_hash = ?1")?;

                let result = stmt.query_row(params![key_hash], |row| {
                    Ok(StoredEntry { payload: row.get(0)?, created_at_ms: row.get(1)?, ttl_ms: row.get(2)? })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(
                        e @ (rusqlite::Error::InvalidColumnType(..)
                        | rusqlite::Error::FromSqlConversionFailure(..)
                        | rusqlite::Error::IntegralValueOutOfRange(..)),
                    ) => {
                        tracing::warn!(key = %key_label, error = %e, "unreadable cache row treated as miss");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let now = now_ms();
        Ok(entry.filter(|e| e.is_live_at(now)).map(|e| e.payload))
    }

    /// Insert or overwrite an entry. Last writer wins.
    pub async fn put(&self, key: &CacheKey, payload: &str, ttl: Duration) -> Result<(), Error> {
        let key_hash = key.hash();
        let scope = key.scope.tag();
        let fingerprint = key.fingerprint.clone();
        let payload = payload.to_string();
        let created_at_ms = now_ms();
        let ttl_ms = ttl_ms(ttl);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key_hash, scope, fingerprint, payload, created_at_ms, ttl_ms)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        scope = excluded.scope,
                        fingerprint = excluded.fingerprint,
                        payload = excluded.payload,
                        created_at_ms = excluded.created_at_ms,
                        ttl_ms = excluded.ttl_ms",
                    params![key_hash, scope, fingerprint, payload, created_at_ms, ttl_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get and deserialize a live entry.
    ///
    /// A payload that fails to deserialize is logged and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, Error> {
        let Some(payload) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt cache payload treated as miss");
                Ok(None)
            }
        }
    }

    /// Serialize and store an entry.
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: Duration) -> Result<(), Error> {
        let payload = serde_json::to_string(value)?;
        self.put(key, &payload, ttl).await
    }

    /// Remove every entry. Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Physically remove expired entries. Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM cache_entries WHERE ?1 - created_at_ms >= ttl_ms", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every entry in one scope. Returns the number of deleted entries.
    pub async fn purge_scope(&self, scope: CacheScope) -> Result<u64, Error> {
        let tag = scope.tag();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE scope = ?1", params![tag])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Count stored rows in a scope, live or not.
    pub async fn count_scope(&self, scope: CacheScope) -> Result<u64, Error> {
        let tag = scope.tag();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE scope = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
