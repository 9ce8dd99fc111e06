//! answer tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sleuth_engine::Orchestrator;

/// Parameters for the answer tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerParams {
    /// The question to answer.
    pub query: String,

    /// Render the top results in a headless browser regardless of the
    /// automation heuristics.
    #[serde(default)]
    pub force_automation: bool,
}

/// Run the pipeline and return the serialized `AnswerBundle`.
///
/// Retrieval and generation failures degrade inside the bundle; only an
/// empty query comes back as an error.
pub async fn answer_impl(orchestrator: &Orchestrator, params: AnswerParams) -> Result<CallToolResult, McpError> {
    let bundle = orchestrator.answer(&params.query, params.force_automation).await?;
    super::json_result(&bundle)
}
