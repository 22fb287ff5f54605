/// Corrective message appended when the model answers without tool calls.
/// It stays in the conversation permanently, like any other turn.
pub const NO_TOOL_NUDGE: &str = "Your previous response did not include any tool calls. \
Respond with a properly formatted tool call, or call complete_task if everything is done.";

/// What to do after a model response, based on whether it carried tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Tool calls present. The retry counter is reset.
    Proceed,
    /// No tool calls and budget remains: append the nudge and call again.
    Nudge,
    /// No tool calls and the budget is spent: stop the run normally.
    Exhausted,
}

/// Tracks consecutive no-tool-call responses within a run.
///
/// With a budget of `r`, a model that never produces tool calls is nudged
/// exactly `r` times before the run stops. Any response that does carry
/// tool calls resets the counter in full.
pub struct RetryController {
    attempts: u32,
    max_retries: u32,
}

impl RetryController {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempts: 0,
            max_retries,
        }
    }

    pub fn on_response(&mut self, has_tool_calls: bool) -> RetryVerdict {
        if has_tool_calls {
            self.attempts = 0;
            return RetryVerdict::Proceed;
        }
        if self.attempts < self.max_retries {
            self.attempts += 1;
            RetryVerdict::Nudge
        } else {
            RetryVerdict::Exhausted
        }
    }

    /// Nudges issued since the last response that carried tool calls.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
