use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id issued by the backend. Ollama's native API has none.
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

/// A provider response normalized at the gateway boundary: content and tool
/// calls are always materialized (empty, never null) and token counts default
/// to zero when the backend does not report them.
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    /// Thinking trace from reasoning models, when the backend surfaces one.
    pub reasoning: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl LLMResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Correlation id of the originating call (for role="tool" messages).
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this result (for role="tool" messages).
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCallRequest>>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
            tool_calls,
            ..Default::default()
        }
    }

    pub fn tool_result(
        tool_name: impl Into<String>,
        tool_call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: "tool".into(),
            content: content.into(),
            tool_call_id,
            tool_name: Some(tool_name.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// One completion call. Backend failures are not retried here; the loop
    /// treats them as fatal for the run.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition])
    -> anyhow::Result<LLMResponse>;

    fn model(&self) -> &str;
}
