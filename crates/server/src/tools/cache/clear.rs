//! cache_clear tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sleuth_core::CacheDb;

/// The cache_clear tool takes no parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

pub async fn clear_impl(cache: &CacheDb, _params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let deleted = cache.clear().await?;
    tracing::info!(deleted, "cache cleared");
    crate::tools::json_result(&CacheClearOutput { deleted })
}
