use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

fn default_context_length() -> u32 {
    8192
}

fn default_max_output_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Context window requested from the model (`num_ctx`).
    #[serde(default = "default_context_length", rename = "contextLength")]
    pub context_length: u32,
    /// Completion token cap per call (`num_predict`).
    #[serde(default = "default_max_output_tokens", rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            context_length: default_context_length(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

fn default_max_iterations() -> usize {
    20
}

fn default_max_tools_per_iteration() -> usize {
    5
}

fn default_max_no_tool_retries() -> u32 {
    2
}

fn default_user_prompt() -> String {
    "Execute your given tasks autonomously without any further user input.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations", rename = "maxIterations")]
    pub max_iterations: usize,
    #[serde(
        default = "default_max_tools_per_iteration",
        rename = "maxToolsPerIteration"
    )]
    pub max_tools_per_iteration: usize,
    /// How many corrective nudges to send when the model answers without tool calls.
    #[serde(default = "default_max_no_tool_retries", rename = "maxNoToolRetries")]
    pub max_no_tool_retries: u32,
    /// Files concatenated (in order, blank-line separated) into the system prompt.
    #[serde(default, rename = "systemPromptFiles")]
    pub system_prompt_files: Vec<PathBuf>,
    /// The user-role instruction appended at the start of every iteration.
    #[serde(default = "default_user_prompt", rename = "userPrompt")]
    pub user_prompt: String,
    /// External tool names the model may call. Built-ins are always available.
    #[serde(default, rename = "allowedTools")]
    pub allowed_tools: Vec<String>,
    /// Annotate each iteration's prompt with iteration count and context usage.
    #[serde(default = "default_true", rename = "statusPrompts")]
    pub status_prompts: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tools_per_iteration: default_max_tools_per_iteration(),
            max_no_tool_retries: default_max_no_tool_retries(),
            system_prompt_files: vec![],
            user_prompt: default_user_prompt(),
            allowed_tools: vec![],
            status_prompts: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

fn default_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds to sleep between runs.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment for the child process. Values may reference `${VAR}`.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), crate::errors::AutocrabError> {
        self.validate_ollama()?;
        self.validate_agent()?;
        self.validate_daemon()?;
        self.validate_mcp()?;
        Ok(())
    }

    fn validate_ollama(&self) -> Result<(), crate::errors::AutocrabError> {
        use crate::errors::AutocrabError;

        if self.ollama.host.is_empty() {
            return Err(AutocrabError::Config("ollama.host must not be empty".into()));
        }
        if self.ollama.context_length == 0 {
            return Err(AutocrabError::Config(
                "ollama.contextLength must be > 0".into(),
            ));
        }
        if self.ollama.max_output_tokens == 0 {
            return Err(AutocrabError::Config(
                "ollama.maxOutputTokens must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), crate::errors::AutocrabError> {
        use crate::errors::AutocrabError;
        let a = &self.agent;

        if a.max_iterations == 0 {
            return Err(AutocrabError::Config(
                "agent.maxIterations must be > 0".into(),
            ));
        }
        if a.max_iterations > 1000 {
            return Err(AutocrabError::Config(
                "agent.maxIterations is unreasonably large (> 1000)".into(),
            ));
        }
        if a.max_tools_per_iteration == 0 {
            return Err(AutocrabError::Config(
                "agent.maxToolsPerIteration must be > 0".into(),
            ));
        }
        if a.user_prompt.trim().is_empty() {
            return Err(AutocrabError::Config(
                "agent.userPrompt must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_daemon(&self) -> Result<(), crate::errors::AutocrabError> {
        use crate::errors::AutocrabError;

        if self.daemon.enabled {
            if self.daemon.interval == 0 {
                return Err(AutocrabError::Config(
                    "daemon.interval must be > 0 when enabled".into(),
                ));
            }
            if self.daemon.interval < 60 {
                warn!("Daemon interval is very short (< 60s), this may cause high resource usage");
            }
        }
        Ok(())
    }

    fn validate_mcp(&self) -> Result<(), crate::errors::AutocrabError> {
        use crate::errors::AutocrabError;

        for (name, server) in &self.mcp.servers {
            if server.enabled && server.command.trim().is_empty() {
                return Err(AutocrabError::Config(format!(
                    "mcp.servers.{name}.command must not be empty"
                )));
            }
        }
        Ok(())
    }
}
