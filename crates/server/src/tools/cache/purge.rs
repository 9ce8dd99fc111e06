//! cache_purge tool implementation.
//!
//! Purges one cache scope, or only the expired rows when no scope is given.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sleuth_core::{CacheDb, CacheScope};

/// Which entries to purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PurgeScope {
    /// Per-variant search results.
    Search,
    /// Planned query variants.
    Plan,
    /// Rendered page content.
    Page,
    /// Hosts skipped by automation after a failed render.
    Domain,
    /// Expired entries of any scope.
    Expired,
}

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Scope to purge. Defaults to `expired`.
    #[serde(default)]
    pub scope: Option<PurgeScope>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub scope: PurgeScope,
    /// Number of entries deleted.
    pub deleted: u64,
}

pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let scope = params.scope.unwrap_or(PurgeScope::Expired);

    let deleted = match scope {
        PurgeScope::Search => cache.purge_scope(CacheScope::Search).await?,
        PurgeScope::Plan => cache.purge_scope(CacheScope::Plan).await?,
        PurgeScope::Page => cache.purge_scope(CacheScope::Page).await?,
        PurgeScope::Domain => cache.purge_scope(CacheScope::Domain).await?,
        PurgeScope::Expired => cache.purge_expired().await?,
    };

    tracing::info!(?scope, deleted, "cache purged");
    crate::tools::json_result(&CachePurgeOutput { scope, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use sleuth_core::CacheKey;
    use std::time::Duration;

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let ttl = Duration::from_secs(60);
        cache.put_json(&CacheKey::search("rust"), &["r"], ttl).await.unwrap();
        cache.put_json(&CacheKey::search("go"), &["g"], ttl).await.unwrap();
        cache.put_json(&CacheKey::plan("rust"), &["rust"], ttl).await.unwrap();
        cache.put_json(&CacheKey::page("https://old.example/"), &"stale", Duration::ZERO).await.unwrap();
        cache
    }

    async fn run(cache: &CacheDb, params: CachePurgeParams) -> CachePurgeOutput {
        let result = purge_impl(cache, params).await.unwrap();
        serde_json::from_str(&result_text(&result)).unwrap()
    }

    #[tokio::test]
    async fn test_purge_single_scope() {
        let cache = seeded().await;

        let output = run(&cache, CachePurgeParams { scope: Some(PurgeScope::Search) }).await;
        assert_eq!(output.deleted, 2);
        assert_eq!(cache.count_scope(CacheScope::Search).await.unwrap(), 0);
        assert_eq!(cache.count_scope(CacheScope::Plan).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_defaults_to_expired() {
        let cache = seeded().await;

        let output = run(&cache, CachePurgeParams::default()).await;
        assert_eq!(output.scope, PurgeScope::Expired);
        assert_eq!(output.deleted, 1);
        assert_eq!(cache.count_scope(CacheScope::Page).await.unwrap(), 0);
        assert_eq!(cache.count_scope(CacheScope::Search).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_purge_forgets_failed_hosts() {
        let cache = seeded().await;
        cache.put_json(&CacheKey::domain("spa.example"), &"render failed", Duration::from_secs(60)).await.unwrap();

        let output = run(&cache, CachePurgeParams { scope: Some(PurgeScope::Domain) }).await;
        assert_eq!(output.deleted, 1);
        assert_eq!(cache.count_scope(CacheScope::Search).await.unwrap(), 2);
    }

    #[test]
    fn test_scope_parses_lowercase() {
        let params: CachePurgeParams = serde_json::from_str(r#"{"scope": "page"}"#).unwrap();
        assert_eq!(params.scope, Some(PurgeScope::Page));
        assert!(serde_json::from_str::<CachePurgeParams>(r#"{"scope": "everything"}"#).is_err());
    }
}
