use super::*;
use crate::agent::builtins::default_builtins;
use crate::providers::base::{LLMResponse, Message, ToolDefinition};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Pops one canned response per chat call and records the last user message
/// each call saw. Errors when the script runs out.
struct ScriptedProvider {
    responses: Mutex<VecDeque<LLMResponse>>,
    seen_prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            seen_prompts: Mutex::new(Vec::new()),
        })
    }

    fn seen_prompts(&self) -> Vec<String> {
        self.seen_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.seen_prompts.lock().unwrap().push(last_user);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script ran out of responses"))
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

struct OkBackend;

#[async_trait]
impl ToolBackend for OkBackend {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(vec![])
    }

    async fn call_tool(&self, name: &str, _arguments: Map<String, Value>) -> Result<String> {
        Ok(format!("{name} ok"))
    }
}

fn tool_call(name: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: None,
        name: name.to_string(),
        arguments: json!({}),
    }
}

fn respond_with(calls: Vec<ToolCallRequest>) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        reasoning: None,
        tool_calls: calls,
        tokens_in: 500,
        tokens_out: 20,
    }
}

fn respond_text(text: &str) -> LLMResponse {
    LLMResponse {
        content: text.to_string(),
        reasoning: None,
        tool_calls: vec![],
        tokens_in: 500,
        tokens_out: 20,
    }
}

fn budget(max_iterations: usize, max_no_tool_retries: u32) -> RunBudget {
    RunBudget {
        max_iterations,
        max_tools_per_iteration: 5,
        max_no_tool_retries,
        context_token_limit: 1000,
    }
}

fn agent(
    provider: Arc<ScriptedProvider>,
    budget: RunBudget,
    status_prompts: bool,
) -> AgentLoop {
    let registry = ToolRegistry::build(
        default_builtins(),
        vec![ToolDefinition {
            name: "search".to_string(),
            description: "test tool".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }],
        &["search".to_string()],
    )
    .unwrap();
    AgentLoop::new(AgentLoopConfig {
        provider,
        backend: Arc::new(OkBackend),
        registry,
        system_prompt: "sys".to_string(),
        user_prompt: "work".to_string(),
        status_prompts,
        budget,
    })
}

fn roles(agent: &AgentLoop) -> Vec<String> {
    agent
        .history()
        .snapshot()
        .iter()
        .map(|m| m.role.clone())
        .collect()
}

#[tokio::test]
async fn terminal_tool_stops_the_run() {
    let provider = ScriptedProvider::new(vec![respond_with(vec![tool_call("complete_task")])]);
    let mut agent = agent(provider.clone(), budget(10, 2), false);

    let report = agent.run().await.unwrap();

    assert_eq!(report.stop, StopReason::TerminalTool);
    assert_eq!(report.iterations, 1);
    assert_eq!(roles(&agent), vec!["system", "user", "assistant", "tool"]);
}

#[tokio::test]
async fn iteration_budget_stops_the_run() {
    let provider = ScriptedProvider::new(vec![
        respond_with(vec![tool_call("search")]),
        respond_with(vec![tool_call("search")]),
    ]);
    let mut agent = agent(provider.clone(), budget(2, 2), false);

    let report = agent.run().await.unwrap();

    assert_eq!(report.stop, StopReason::MaxIterations);
    assert_eq!(report.iterations, 2);
    assert_eq!(provider.seen_prompts().len(), 2);
}

#[tokio::test]
async fn no_tool_answers_exhaust_the_retry_budget() {
    let provider = ScriptedProvider::new(vec![
        respond_text("thinking"),
        respond_text("still thinking"),
    ]);
    let mut agent = agent(provider.clone(), budget(10, 1), false);

    let report = agent.run().await.unwrap();

    assert_eq!(report.stop, StopReason::NoToolCalls);
    assert_eq!(report.iterations, 0);

    let snapshot = agent.history().snapshot();
    let nudges: Vec<&Message> = snapshot
        .iter()
        .filter(|m| m.role == "user" && m.content == NO_TOOL_NUDGE)
        .collect();
    assert_eq!(nudges.len(), 1);
    // Both content-only answers stay in the conversation.
    let assistant_texts: Vec<&str> = snapshot
        .iter()
        .filter(|m| m.role == "assistant")
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(assistant_texts, vec!["thinking", "still thinking"]);
}

#[tokio::test]
async fn retry_budget_is_fresh_after_a_tool_call() {
    // One nudge, then tool calls (counter resets), then two more empty
    // answers use a full fresh budget of one nudge before exhausting.
    let provider = ScriptedProvider::new(vec![
        respond_text("hmm"),
        respond_with(vec![tool_call("search")]),
        respond_text("hmm again"),
        respond_text("give up"),
    ]);
    let mut agent = agent(provider.clone(), budget(10, 1), false);

    let report = agent.run().await.unwrap();

    assert_eq!(report.stop, StopReason::NoToolCalls);
    assert_eq!(report.iterations, 1);
    assert_eq!(provider.seen_prompts().len(), 4);
}

#[tokio::test]
async fn status_prompts_annotate_iteration_and_context_usage() {
    let provider = ScriptedProvider::new(vec![
        respond_with(vec![tool_call("search")]),
        respond_with(vec![tool_call("complete_task")]),
    ]);
    let mut agent = agent(provider.clone(), budget(3, 2), true);

    agent.run().await.unwrap();

    let prompts = provider.seen_prompts();
    // First call: nothing consumed yet. Second call: 500 of 1000 tokens.
    assert_eq!(prompts[0], "work [iteration 1/3 | context: 0%]");
    assert_eq!(prompts[1], "work [iteration 2/3 | context: 50%]");
}

#[tokio::test]
async fn plain_prompt_when_status_prompts_disabled() {
    let provider = ScriptedProvider::new(vec![respond_with(vec![tool_call("complete_task")])]);
    let mut agent = agent(provider.clone(), budget(3, 2), false);

    agent.run().await.unwrap();

    assert_eq!(provider.seen_prompts(), vec!["work".to_string()]);
}

#[tokio::test]
async fn empty_assistant_content_is_appended_when_calls_present() {
    let provider = ScriptedProvider::new(vec![respond_with(vec![tool_call("complete_task")])]);
    let mut agent = agent(provider.clone(), budget(3, 2), false);

    agent.run().await.unwrap();

    let snapshot = agent.history().snapshot();
    let assistant = snapshot.iter().find(|m| m.role == "assistant").unwrap();
    assert_eq!(assistant.content, "");
    assert_eq!(assistant.tool_calls.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn provider_failure_ends_the_run_as_an_error() {
    let provider = ScriptedProvider::new(vec![]);
    let mut agent = agent(provider.clone(), budget(3, 2), false);

    let err = agent.run().await.unwrap_err();
    assert!(err.to_string().contains("script ran out"));
}

#[tokio::test]
async fn run_forever_resets_history_between_cycles() {
    let provider = ScriptedProvider::new(vec![
        respond_with(vec![tool_call("complete_task")]),
        respond_with(vec![tool_call("complete_task")]),
    ]);
    let mut agent = agent(provider.clone(), budget(3, 2), false);

    // Two full cycles, then the script runs dry and the error surfaces.
    let err = agent
        .run_forever(Duration::from_millis(5))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("script ran out"));
    assert_eq!(provider.seen_prompts().len(), 3);

    // The third cycle started from a reseeded conversation.
    let snapshot = agent.history().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].role, "system");
    assert_eq!(snapshot[0].content, "sys");
    assert_eq!(snapshot[1].role, "user");
}
