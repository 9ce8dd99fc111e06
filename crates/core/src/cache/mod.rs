//! SQLite-backed TTL cache shared across orchestration calls.
//!
//! This module provides a persistent key-value cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Scoped keys (search results, query plans, rendered pages) hashed with SHA-256
//! - Lazy expiry: entries are checked on read, never evicted in the background
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Full clear and scoped purges for operators

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::{CacheKey, CacheScope};
