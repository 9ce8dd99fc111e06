//! Core types and shared functionality for sleuth.
//!
//! This crate provides:
//! - TTL cache store with SQLite backend
//! - Conversation memory store
//! - Unified error types
//! - Layered configuration
//! - The query/result data model shared by the engine and its collaborators

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;

pub use cache::{CacheDb, CacheKey, CacheScope};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use memory::{ConversationMemory, NoopMemory, SqliteMemory};
pub use model::{
    AnswerBundle, AnswerOutcome, AutomationDecision, AutomationSignal, PageContent, SearchResult, VariantReport,
};
pub use query::{Query, QueryVariant, fingerprint};
