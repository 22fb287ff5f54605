use crate::errors::AutocrabError;
use crate::providers::base::{LLMProvider, LLMResponse, Message, ToolCallRequest, ToolDefinition};
use crate::providers::provider_http_client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

/// Client for Ollama's native `/api/chat` endpoint.
///
/// Runs every call with `stream: false` and a fixed context window and
/// completion cap from config. Tool-call arguments are passed through
/// unmodified; the dispatcher owns argument decoding.
pub struct OllamaProvider {
    host: String,
    model: String,
    num_ctx: u32,
    num_predict: u32,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: &crate::config::OllamaConfig) -> Self {
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            num_ctx: config.context_length,
            num_predict: config.max_output_tokens,
            client: provider_http_client(),
        }
    }

    #[cfg(test)]
    fn with_base_url(base_url: String, model: String) -> Self {
        Self {
            host: base_url.trim_end_matches('/').to_string(),
            model,
            num_ctx: 8192,
            num_predict: 1024,
            client: provider_http_client(),
        }
    }

    fn serialize_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let mut m = json!({
                    "role": msg.role,
                    "content": msg.content,
                });

                if let Some(ref tool_calls) = msg.tool_calls {
                    m["tool_calls"] = json!(
                        tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments,
                                    }
                                })
                            })
                            .collect::<Vec<_>>()
                    );
                }

                if let Some(ref tool_name) = msg.tool_name {
                    m["tool_name"] = json!(tool_name);
                }

                m
            })
            .collect()
    }

    fn serialize_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn parse_response(json: &Value) -> Result<LLMResponse> {
        let message = json
            .get("message")
            .context("No message in Ollama response")?;

        let content = message["content"].as_str().unwrap_or("").to_string();
        let reasoning = message["thinking"]
            .as_str()
            .map(std::string::ToString::to_string);

        let mut tool_calls = Vec::new();
        if let Some(tool_calls_array) = message["tool_calls"].as_array() {
            for tc in tool_calls_array {
                if let Some(function) = tc["function"].as_object() {
                    tool_calls.push(ToolCallRequest {
                        id: tc["id"].as_str().map(std::string::ToString::to_string),
                        name: function
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                        arguments: function.get("arguments").cloned().unwrap_or(Value::Null),
                    });
                }
            }
        }

        Ok(LLMResponse {
            content,
            reasoning,
            tool_calls,
            tokens_in: json["prompt_eval_count"].as_u64().unwrap_or(0),
            tokens_out: json["eval_count"].as_u64().unwrap_or(0),
        })
    }
}

/// Map a non-success HTTP response to a typed provider error.
async fn check_http_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let error_text = resp
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    let retryable = status.is_server_error();
    Err(AutocrabError::Provider {
        message: format!("Ollama API error ({}): {}", status.as_u16(), error_text),
        retryable,
    }
    .into())
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let payload = json!({
            "model": self.model,
            "messages": Self::serialize_messages(messages),
            "tools": Self::serialize_tools(tools),
            "stream": false,
            "options": {
                "num_ctx": self.num_ctx,
                "num_predict": self.num_predict,
            }
        });

        debug!(
            "Sending chat request to Ollama ({} messages, {} tools)",
            messages.len(),
            tools.len()
        );

        let resp = self
            .client
            .post(format!("{}/api/chat", self.host))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Ollama API")?;

        let resp = check_http_status(resp).await?;
        let json: Value = resp
            .json()
            .await
            .context("Failed to parse Ollama API response")?;

        Self::parse_response(&json)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
