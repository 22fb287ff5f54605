use crate::agent::dispatch::dispatch_tool_calls;
use crate::agent::history::History;
use crate::agent::registry::ToolRegistry;
use crate::agent::retry::{NO_TOOL_NUDGE, RetryController, RetryVerdict};
use crate::config::Config;
use crate::console;
use crate::mcp::ToolBackend;
use crate::providers::base::{LLMProvider, ToolCallRequest};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-run limits, lifted from `Config` at startup.
#[derive(Debug, Clone)]
pub struct RunBudget {
    pub max_iterations: usize,
    pub max_tools_per_iteration: usize,
    pub max_no_tool_retries: u32,
    /// Model context window, used for the status prompt's usage figure.
    pub context_token_limit: u64,
}

impl RunBudget {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            max_tools_per_iteration: config.agent.max_tools_per_iteration,
            max_no_tool_retries: config.agent.max_no_tool_retries,
            context_token_limit: u64::from(config.ollama.context_length),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A built-in signaled completion.
    TerminalTool,
    /// The iteration budget was spent.
    MaxIterations,
    /// The model kept responding without tool calls.
    NoToolCalls,
}

#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub stop: StopReason,
    /// Full iterations completed (a run that stops mid-iteration because
    /// the retry budget ran out does not count that iteration).
    pub iterations: usize,
}

/// Everything needed to assemble an [`AgentLoop`].
pub struct AgentLoopConfig {
    pub provider: Arc<dyn LLMProvider>,
    pub backend: Arc<dyn ToolBackend>,
    pub registry: ToolRegistry,
    pub system_prompt: String,
    pub user_prompt: String,
    pub status_prompts: bool,
    pub budget: RunBudget,
}

/// The iteration driver.
///
/// Each iteration appends the user prompt, calls the model (retrying inside
/// the iteration when it answers without tool calls), appends the assistant
/// turn, and dispatches the requested tools. The loop stops when a built-in
/// signals completion, the iteration budget runs out, or the no-tool retry
/// budget runs out. Provider failures are not retried; they end the run
/// as errors.
pub struct AgentLoop {
    provider: Arc<dyn LLMProvider>,
    backend: Arc<dyn ToolBackend>,
    registry: ToolRegistry,
    history: History,
    user_prompt: String,
    status_prompts: bool,
    budget: RunBudget,
    last_tokens_in: u64,
}

impl AgentLoop {
    pub fn new(config: AgentLoopConfig) -> Self {
        let AgentLoopConfig {
            provider,
            backend,
            registry,
            system_prompt,
            user_prompt,
            status_prompts,
            budget,
        } = config;
        let history = History::new(system_prompt);
        Self {
            provider,
            backend,
            registry,
            history,
            user_prompt,
            status_prompts,
            budget,
            last_tokens_in: 0,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Drive iterations until a stop condition is reached.
    pub async fn run(&mut self) -> Result<RunReport> {
        let mut retry = RetryController::new(self.budget.max_no_tool_retries);
        let mut iterations = 0;

        loop {
            let prompt = self.iteration_prompt(iterations);
            let msg = self.history.append_user(prompt);
            console::print_message(msg);

            let Some((content, calls)) = self.obtain_tool_calls(&mut retry).await? else {
                info!(
                    "Stopping: no tool calls after {} corrective retries",
                    self.budget.max_no_tool_retries
                );
                return Ok(RunReport {
                    stop: StopReason::NoToolCalls,
                    iterations,
                });
            };

            // Backends reject tool results that do not follow an assistant
            // turn carrying the calls, so this append happens even when the
            // content is empty.
            let msg = self.history.append_assistant(content, Some(calls.clone()));
            console::print_message(msg);

            let outcome = dispatch_tool_calls(
                &self.registry,
                self.backend.as_ref(),
                &calls,
                self.budget.max_tools_per_iteration,
                &mut self.history,
            )
            .await;
            iterations += 1;

            if outcome.terminal {
                info!(
                    "Stopping: task completion signaled on iteration {}",
                    iterations
                );
                return Ok(RunReport {
                    stop: StopReason::TerminalTool,
                    iterations,
                });
            }
            if iterations >= self.budget.max_iterations {
                info!(
                    "Stopping: iteration budget ({}) exhausted",
                    self.budget.max_iterations
                );
                return Ok(RunReport {
                    stop: StopReason::MaxIterations,
                    iterations,
                });
            }
        }
    }

    /// Daemon mode: run to completion, sleep, reset the conversation, and
    /// start over. Only a provider failure ends this loop.
    pub async fn run_forever(&mut self, interval: Duration) -> Result<()> {
        loop {
            let report = self.run().await?;
            info!(
                "Run stopped ({:?}) after {} iterations, sleeping {}",
                report.stop,
                report.iterations,
                humantime::format_duration(interval)
            );
            tokio::time::sleep(interval).await;
            self.history.reset();
            self.last_tokens_in = 0;
        }
    }

    /// Call the model until it produces tool calls or the no-tool retry
    /// budget runs out. Returns `None` when exhausted. Content-only answers
    /// are kept in the history either way.
    async fn obtain_tool_calls(
        &mut self,
        retry: &mut RetryController,
    ) -> Result<Option<(String, Vec<ToolCallRequest>)>> {
        loop {
            let response = self
                .provider
                .chat(self.history.snapshot(), self.registry.definitions())
                .await?;
            console::print_api_usage(response.tokens_in, response.tokens_out);
            self.last_tokens_in = response.tokens_in;

            match retry.on_response(response.has_tool_calls()) {
                RetryVerdict::Proceed => {
                    return Ok(Some((response.content, response.tool_calls)));
                }
                RetryVerdict::Nudge => {
                    if !response.content.trim().is_empty() {
                        let msg = self.history.append_assistant(response.content, None);
                        console::print_message(msg);
                    }
                    warn!(
                        "Model produced no tool calls, nudging (attempt {}/{})",
                        retry.attempts(),
                        self.budget.max_no_tool_retries
                    );
                    let msg = self.history.append_user(NO_TOOL_NUDGE);
                    console::print_message(msg);
                }
                RetryVerdict::Exhausted => {
                    if !response.content.trim().is_empty() {
                        let msg = self.history.append_assistant(response.content, None);
                        console::print_message(msg);
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// The per-iteration user prompt, annotated with progress and context
    /// usage when `agent.statusPrompts` is on. Usage reflects the previous
    /// call's prompt tokens; the first iteration reports 0%.
    fn iteration_prompt(&self, completed_iterations: usize) -> String {
        if !self.status_prompts {
            return self.user_prompt.clone();
        }
        let used_pct = if self.budget.context_token_limit == 0 {
            0
        } else {
            self.last_tokens_in * 100 / self.budget.context_token_limit
        };
        format!(
            "{} [iteration {}/{} | context: {}%]",
            self.user_prompt,
            completed_iterations + 1,
            self.budget.max_iterations,
            used_pct
        )
    }
}

#[cfg(test)]
#[path = "loop/tests.rs"]
mod tests;
