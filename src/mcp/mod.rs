use crate::errors::AutocrabError;
use crate::providers::base::ToolDefinition;
use crate::utils::expand_env;
use anyhow::Result;
use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, RawContent};
use rmcp::transport::TokioChildProcess;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{info, warn};

/// External tool execution backend.
///
/// Implementations surface declared tool failures as `Err`; the dispatcher
/// converts those into error tool-results rather than aborting the run.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Execute a tool and return its text output.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String>;
}

/// A running MCP server connection.
struct RunningMcpServer {
    client: rmcp::service::RunningService<rmcp::RoleClient, ()>,
    server_name: String,
}

/// Manages stdio MCP servers and routes tool calls to the server that owns them.
///
/// Servers are spawned and their tools discovered once, at connect time. A
/// server that fails to spawn, handshake, or list its tools is a startup
/// error: the operator referenced it, so continuing without it would silently
/// change the registry.
pub struct McpManager {
    servers: Vec<RunningMcpServer>,
    tools: Vec<ToolDefinition>,
    routes: HashMap<String, usize>,
}

impl McpManager {
    /// Connect to all enabled MCP servers defined in config and discover their tools.
    pub async fn connect(config: &crate::config::McpConfig) -> Result<Self> {
        let mut manager = Self {
            servers: Vec::new(),
            tools: Vec::new(),
            routes: HashMap::new(),
        };

        for (name, server_cfg) in &config.servers {
            if !server_cfg.enabled {
                info!("MCP server '{}' is disabled, skipping", name);
                continue;
            }

            let server =
                Self::connect_server(name, &server_cfg.command, &server_cfg.args, &server_cfg.env)
                    .await
                    .map_err(|e| {
                        AutocrabError::Config(format!("MCP server '{name}' failed to start: {e}"))
                    })?;
            info!("MCP server '{}' connected", name);
            let index = manager.servers.len();
            manager.servers.push(server);
            manager.discover_tools(index).await?;
        }

        Ok(manager)
    }

    async fn connect_server(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<RunningMcpServer> {
        let mut cmd = tokio::process::Command::new(command);
        for arg in args {
            cmd.arg(expand_env(arg));
        }
        for (k, v) in env {
            cmd.env(k, expand_env(v));
        }

        // Pipe stdin/stdout for MCP communication, inherit stderr for logging
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let transport = TokioChildProcess::new(cmd)?;
        let client = tokio::time::timeout(std::time::Duration::from_secs(30), ().serve(transport))
            .await
            .map_err(|_| anyhow::anyhow!("MCP handshake timed out for server '{}' (30s)", name))?
            .map_err(|e| anyhow::anyhow!("MCP handshake failed for server '{}': {}", name, e))?;

        Ok(RunningMcpServer {
            client,
            server_name: name.to_string(),
        })
    }

    /// Discover the tools of one connected server, recording routing entries.
    async fn discover_tools(&mut self, index: usize) -> Result<()> {
        let server = &self.servers[index];
        let mcp_tools = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            server.client.peer().list_all_tools(),
        )
        .await
        .map_err(|_| {
            AutocrabError::Config(format!(
                "Tool discovery timed out for MCP server '{}' (10s)",
                server.server_name
            ))
        })?
        .map_err(|e| {
            AutocrabError::Config(format!(
                "Failed to list tools from MCP server '{}': {}",
                server.server_name, e
            ))
        })?;

        for mcp_tool in mcp_tools {
            let name = mcp_tool.name.to_string();
            let description = mcp_tool.description.as_deref().unwrap_or("").to_string();
            // Convert the input_schema Arc<Map> to a Value
            let input_schema = Value::Object((*mcp_tool.input_schema).clone());

            info!(
                "Discovered MCP tool '{}' from server '{}'",
                name, server.server_name
            );
            // First server wins on duplicate names; the registry rejects the
            // duplicate definition before anything can be called.
            self.routes.entry(name.clone()).or_insert(index);
            self.tools.push(ToolDefinition {
                name,
                description,
                parameters: input_schema,
            });
        }

        Ok(())
    }

    /// Gracefully shut down all MCP server connections.
    pub async fn shutdown(self) {
        for server in self.servers {
            if let Err(e) = server.client.cancel().await {
                warn!(
                    "Error shutting down MCP server '{}': {}",
                    server.server_name, e
                );
            }
        }
    }
}

/// Extract the text of a tool result, enforcing the text-only contract.
///
/// Results flagged as errors surface their text as the failure reason. Any
/// non-text content item in a successful result is a contract violation, as
/// is a result with no text at all.
fn extract_text(tool: &str, result: &CallToolResult) -> Result<String> {
    let is_error = result.is_error.unwrap_or(false);

    let mut texts: Vec<&str> = Vec::new();
    for content in &result.content {
        match &content.raw {
            RawContent::Text(text) => texts.push(&text.text),
            // Error results are diagnostic; skip non-text items instead of
            // masking the declared failure.
            _ if is_error => {}
            RawContent::Image(_) => {
                return Err(AutocrabError::Tool {
                    tool: tool.to_string(),
                    message: "Non-text content type not supported: image".into(),
                }
                .into());
            }
            RawContent::Audio(_) => {
                return Err(AutocrabError::Tool {
                    tool: tool.to_string(),
                    message: "Non-text content type not supported: audio".into(),
                }
                .into());
            }
            _ => {
                return Err(AutocrabError::Tool {
                    tool: tool.to_string(),
                    message: "Non-text content type not supported".into(),
                }
                .into());
            }
        }
    }

    if is_error {
        let reason = if texts.is_empty() {
            "tool reported an error".to_string()
        } else {
            texts.join("\n")
        };
        return Err(AutocrabError::Tool {
            tool: tool.to_string(),
            message: reason,
        }
        .into());
    }

    if texts.is_empty() {
        return Err(AutocrabError::Tool {
            tool: tool.to_string(),
            message: "Tool result must contain at least one text content item".into(),
        }
        .into());
    }

    Ok(texts.join("\n"))
}

#[async_trait]
impl ToolBackend for McpManager {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        let index = *self.routes.get(name).ok_or_else(|| AutocrabError::Tool {
            tool: name.to_string(),
            message: "not provided by any connected MCP server".into(),
        })?;
        let server = &self.servers[index];

        let mut request = CallToolRequestParams::new(Cow::Owned(name.to_string()));
        request.arguments = if arguments.is_empty() {
            None
        } else {
            Some(arguments)
        };

        let result = server
            .client
            .peer()
            .call_tool(request)
            .await
            .map_err(|e| anyhow::anyhow!("MCP tool '{}' call failed: {}", name, e))?;

        extract_text(name, &result)
    }
}
