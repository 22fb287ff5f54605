// Shared test helpers; not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use autocrab::agent::builtins::default_builtins;
use autocrab::agent::registry::ToolRegistry;
use autocrab::agent::{AgentLoop, AgentLoopConfig, RunBudget};
use autocrab::mcp::ToolBackend;
use autocrab::providers::base::{
    LLMProvider, LLMResponse, Message, ToolCallRequest, ToolDefinition,
};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Pops one scripted response per chat call and records the message
/// snapshot each call saw. Errors when the script runs out.
pub struct MockLLMProvider {
    responses: Mutex<VecDeque<LLMResponse>>,
    pub calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLLMProvider {
    pub fn with_responses(responses: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from(responses)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn recorded(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> anyhow::Result<LLMResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock provider ran out of scripted responses"))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

// --- Response builders ---

pub fn text_response(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        reasoning: None,
        tool_calls: vec![],
        tokens_in: 0,
        tokens_out: 0,
    }
}

pub fn tool_response(calls: Vec<ToolCallRequest>) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        reasoning: None,
        tool_calls: calls,
        tokens_in: 0,
        tokens_out: 0,
    }
}

pub fn tool_call(name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        id: None,
        name: name.to_string(),
        arguments,
    }
}

// --- Tool backend mock ---

/// Answers from a canned result table and records every invocation.
pub struct MockToolBackend {
    results: HashMap<String, String>,
    failing: HashSet<String>,
    pub invocations: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockToolBackend {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            failing: HashSet::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, name: &str, content: &str) -> Self {
        self.results.insert(name.to_string(), content.to_string());
        self
    }

    pub fn with_failure(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn invocation_names(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Default for MockToolBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackend for MockToolBackend {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDefinition>> {
        Ok(vec![])
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> anyhow::Result<String> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        if self.failing.contains(name) {
            anyhow::bail!("tool backend failure");
        }
        Ok(self
            .results
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{name} result")))
    }
}

// --- Agent assembly ---

pub fn external_tool(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: format!("{name} (test)"),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

pub fn allow(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

pub fn test_budget() -> RunBudget {
    RunBudget {
        max_iterations: 10,
        max_tools_per_iteration: 5,
        max_no_tool_retries: 2,
        context_token_limit: 8192,
    }
}

pub fn build_agent(
    provider: Arc<MockLLMProvider>,
    backend: Arc<MockToolBackend>,
    external: Vec<ToolDefinition>,
    allowed: &[String],
    budget: RunBudget,
) -> AgentLoop {
    let registry = ToolRegistry::build(default_builtins(), external, allowed)
        .expect("test registry must build");
    AgentLoop::new(AgentLoopConfig {
        provider,
        backend,
        registry,
        system_prompt: "You are a test agent.".to_string(),
        user_prompt: "Execute your given tasks autonomously without any further user input."
            .to_string(),
        status_prompts: false,
        budget,
    })
}
