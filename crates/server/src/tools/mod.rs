//! MCP tool implementations.

pub mod answer;
pub mod cache;

/// Pretty JSON text result, the shape every tool returns.
pub(crate) fn json_result<T: serde::Serialize>(
    value: &T,
) -> Result<rmcp::model::CallToolResult, rmcp::ErrorData> {
    let json = serde_json::to_string_pretty(value).map_err(sleuth_core::Error::from)?;
    Ok(rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn result_text(result: &rmcp::model::CallToolResult) -> String {
    let value = serde_json::to_value(&result.content[0]).unwrap();
    value.get("text").and_then(|v| v.as_str()).expect("text content").to_string()
}
