//! MCP server handler.
//!
//! Routes tool calls to the orchestrator and the cache administration tools.
use crate::tools::answer::{AnswerParams, answer_impl};
use crate::tools::cache::{CacheClearParams, CachePurgeParams, clear_impl, purge_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use sleuth_engine::Orchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct SleuthServer {
    orchestrator: Arc<Orchestrator>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SleuthServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator, tool_router: Self::tool_router() }
    }

    /// Answer a question from cached and live web search results.
    #[tool(
        description = "Answer a question using web search. Expands the query, reuses cached results, optionally renders top pages in a headless browser, and returns the answer with its sources."
    )]
    async fn answer(&self, params: Parameters<AnswerParams>) -> Result<CallToolResult, McpError> {
        answer_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Delete every cache entry. Returns the number of entries removed.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(self.orchestrator.cache(), params.0).await
    }

    #[tool(
        description = "Purge cache entries. With a scope (search, plan, page, domain) removes that scope; without one removes expired entries."
    )]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.orchestrator.cache(), params.0).await
    }
}

impl ServerHandler for SleuthServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sleuth-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
