use crate::agent::history::History;
use crate::agent::registry::{ToolRegistry, ToolRoute};
use crate::console;
use crate::mcp::ToolBackend;
use crate::providers::base::ToolCallRequest;
use serde_json::{Map, Value};
use tracing::warn;

/// What one iteration's dispatch produced.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOutcome {
    /// Calls executed after truncation, including ones that produced an
    /// error result.
    pub executed: usize,
    /// True when a built-in signaled completion.
    pub terminal: bool,
}

/// Execute one iteration's tool calls and append one result message per call.
///
/// The batch is truncated to `max_tools` first. Built-ins then run before
/// externals, preserving the model's order within each group. Per-call
/// failures become "Error: ..." results the model can see and react to;
/// nothing here aborts the run.
pub async fn dispatch_tool_calls(
    registry: &ToolRegistry,
    backend: &dyn ToolBackend,
    calls: &[ToolCallRequest],
    max_tools: usize,
    history: &mut History,
) -> DispatchOutcome {
    let batch = if calls.len() > max_tools {
        warn!(
            "Model requested {} tool calls, dispatching the first {} and dropping the rest",
            calls.len(),
            max_tools
        );
        &calls[..max_tools]
    } else {
        calls
    };

    let (builtins, externals): (Vec<&ToolCallRequest>, Vec<&ToolCallRequest>) = batch
        .iter()
        .partition(|call| matches!(registry.route(&call.name), Some(ToolRoute::Builtin(_))));

    let mut executed = 0;
    let mut terminal = false;

    for call in builtins.into_iter().chain(externals) {
        let (content, completed) = execute_call(registry, backend, call).await;
        terminal = terminal || completed;
        executed += 1;
        let msg = history.append_tool_result(&call.name, call.id.clone(), &content);
        console::print_message(msg);
    }

    DispatchOutcome { executed, terminal }
}

/// Run a single call. Returns the result text and whether a built-in
/// signaled completion.
async fn execute_call(
    registry: &ToolRegistry,
    backend: &dyn ToolBackend,
    call: &ToolCallRequest,
) -> (String, bool) {
    match registry.route(&call.name) {
        Some(ToolRoute::Builtin(tool)) => match tool.invoke().await {
            Ok(outcome) => (outcome.message, outcome.completed),
            Err(e) => {
                warn!("Built-in tool '{}' failed: {}", call.name, e);
                (format!("Error: {e}"), false)
            }
        },
        Some(ToolRoute::External) => {
            let arguments = match decode_arguments(&call.arguments) {
                Ok(map) => map,
                Err(detail) => {
                    warn!("Tool '{}' argument decode failed: {}", call.name, detail);
                    return (
                        format!("Error: invalid arguments for tool '{}': {detail}", call.name),
                        false,
                    );
                }
            };
            match backend.call_tool(&call.name, arguments).await {
                Ok(content) => (content, false),
                Err(e) => {
                    warn!("Tool '{}' failed: {}", call.name, e);
                    (format!("Error: {e}"), false)
                }
            }
        }
        None => {
            warn!("Model called unknown tool: {}", call.name);
            (
                format!(
                    "Error: tool '{}' does not exist. Available tools: {}",
                    call.name,
                    registry.names().join(", ")
                ),
                false,
            )
        }
    }
}

/// Decode the arguments payload into the map the MCP backend expects.
///
/// Models sometimes emit arguments as a JSON-encoded string instead of an
/// object, and omit the field entirely for zero-argument tools; both are
/// accepted. Anything else is a per-call error.
fn decode_arguments(arguments: &Value) -> Result<Map<String, Value>, String> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!(
                "expected a JSON object, got {}",
                value_type_name(&other)
            )),
            Err(e) => Err(format!("arguments are not valid JSON: {e}")),
        },
        other => Err(format!(
            "expected a JSON object, got {}",
            value_type_name(other)
        )),
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Null => "null",
    }
}
