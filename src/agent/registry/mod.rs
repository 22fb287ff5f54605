use crate::agent::builtins::BuiltinTool;
use crate::errors::AutocrabError;
use crate::providers::base::ToolDefinition;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Where a tool call executes.
pub enum ToolRoute {
    /// Runs inside the agent process.
    Builtin(Arc<dyn BuiltinTool>),
    /// Forwarded to the MCP backend.
    External,
}

impl std::fmt::Debug for ToolRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolRoute::Builtin(tool) => f.debug_tuple("Builtin").field(&tool.name()).finish(),
            ToolRoute::External => f.write_str("External"),
        }
    }
}

/// Immutable name-to-route table built once at startup.
///
/// Built-ins are always registered. MCP tools are registered only when named
/// in `agent.allowedTools` — an empty list means no external tool is callable.
/// Name collisions and allow-list entries that match nothing are configuration
/// errors, so every name that survives construction is unambiguous for the
/// whole run.
#[derive(Debug)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    routes: HashMap<String, ToolRoute>,
}

impl ToolRegistry {
    pub fn build(
        builtins: Vec<Arc<dyn BuiltinTool>>,
        external: Vec<ToolDefinition>,
        allowed_tools: &[String],
    ) -> Result<Self, AutocrabError> {
        let mut definitions = Vec::with_capacity(builtins.len() + external.len());
        let mut routes = HashMap::new();
        let mut duplicates = Vec::new();

        for tool in builtins {
            let name = tool.name().to_string();
            definitions.push(ToolDefinition {
                name: name.clone(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            });
            if routes.insert(name.clone(), ToolRoute::Builtin(tool)).is_some() {
                duplicates.push(name);
            }
        }

        let advertised: Vec<String> = external.iter().map(|def| def.name.clone()).collect();

        for def in external {
            if !allowed_tools.iter().any(|allowed| allowed == &def.name) {
                debug!(
                    "MCP tool '{}' is not in agent.allowedTools, skipping",
                    def.name
                );
                continue;
            }
            let name = def.name.clone();
            definitions.push(def);
            if routes.insert(name.clone(), ToolRoute::External).is_some() {
                duplicates.push(name);
            }
        }

        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(AutocrabError::Config(format!(
                "duplicate tool names in the registry: {}",
                duplicates.join(", ")
            )));
        }

        let mut missing: Vec<&str> = allowed_tools
            .iter()
            .map(String::as_str)
            .filter(|name| !advertised.iter().any(|adv| adv == name))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(AutocrabError::Config(format!(
                "agent.allowedTools names tools no connected MCP server provides: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            definitions,
            routes,
        })
    }

    /// Route for a tool name. `None` means the model asked for a tool that
    /// was never registered (unknown, or filtered by the allow-list).
    pub fn route(&self, name: &str) -> Option<&ToolRoute> {
        self.routes.get(name)
    }

    /// Definitions advertised to the model: built-ins first, then allowed
    /// MCP tools in discovery order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
