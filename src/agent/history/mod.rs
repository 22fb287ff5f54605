use crate::providers::base::{Message, ToolCallRequest};

/// Append-only conversation history.
///
/// Seeded with the system prompt at construction. Messages are never
/// reordered or pruned during a run; `reset` clears everything and reseeds
/// the same system prompt, which only happens between daemon cycles.
pub struct History {
    messages: Vec<Message>,
    system_prompt: String,
}

impl History {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let messages = vec![Message::system(system_prompt.clone())];
        Self {
            messages,
            system_prompt,
        }
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        // Just pushed, so last() always exists.
        &self.messages[self.messages.len() - 1]
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::user(content))
    }

    /// Append an assistant turn. `tool_calls` carries the calls the model
    /// requested, if any; backends need them on the message so that the
    /// tool results that follow are not orphaned.
    pub fn append_assistant(
        &mut self,
        content: impl Into<String>,
        tool_calls: Option<Vec<ToolCallRequest>>,
    ) -> &Message {
        self.push(Message::assistant(content, tool_calls))
    }

    /// Append a tool result, wrapped in the envelope the model is prompted
    /// to expect.
    pub fn append_tool_result(
        &mut self,
        tool_name: &str,
        tool_call_id: Option<String>,
        content: &str,
    ) -> &Message {
        let wrapped = format!("<tool_response name=\"{tool_name}\">\n{content}\n</tool_response>");
        self.push(Message::tool_result(tool_name, tool_call_id, wrapped))
    }

    /// The full sequence, oldest first. Passed to the provider on every call.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Clear the conversation and reseed the system prompt.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
