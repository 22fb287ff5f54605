use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// What a built-in tool reported back to the loop.
#[derive(Debug, Clone)]
pub struct BuiltinOutcome {
    /// True when the tool signals that the run is finished and the loop
    /// should stop after the current iteration.
    pub completed: bool,
    /// Text appended to the conversation as the tool result.
    pub message: String,
}

/// A tool implemented inside the agent itself rather than by an MCP server.
///
/// Built-ins take no arguments, are registered on every run, and are not
/// subject to the `agent.allowedTools` list.
#[async_trait]
pub trait BuiltinTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema advertised to the model. Built-ins take no arguments,
    /// so the default is an empty object.
    fn parameters(&self) -> Value {
        json!({})
    }

    async fn invoke(&self) -> anyhow::Result<BuiltinOutcome>;
}

/// Signals that all assigned tasks are complete and the loop should exit.
pub struct CompleteTaskTool;

#[async_trait]
impl BuiltinTool for CompleteTaskTool {
    fn name(&self) -> &str {
        "complete_task"
    }

    fn description(&self) -> &str {
        "Signal that all assigned tasks are complete and the agent loop should exit."
    }

    async fn invoke(&self) -> anyhow::Result<BuiltinOutcome> {
        Ok(BuiltinOutcome {
            completed: true,
            message: "Task completion signal received. Exiting agent loop.".to_string(),
        })
    }
}

/// The built-in set registered on every run.
pub fn default_builtins() -> Vec<Arc<dyn BuiltinTool>> {
    vec![Arc::new(CompleteTaskTool)]
}
