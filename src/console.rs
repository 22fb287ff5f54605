//! Conversation echo for the terminal. Each turn is printed as it is
//! appended so an operator can follow the run live.

use crate::providers::base::{Message, ToolDefinition};

const TRUNCATE_AT: usize = 100;

/// Collapse a message body to its first line, capped at `TRUNCATE_AT`
/// characters, with a trailing ellipsis when anything was dropped.
fn truncate(content: &str) -> String {
    let trimmed = content.trim();
    let mut lines = trimmed.lines();
    let first = lines.next().unwrap_or("");
    let multiline = lines.next().is_some();

    let truncated: String = first.chars().take(TRUNCATE_AT).collect();
    if multiline || first.chars().count() > TRUNCATE_AT {
        format!("{truncated}...")
    } else {
        truncated
    }
}

/// Echo one conversation turn to stdout.
pub fn print_message(message: &Message) {
    match message.role.as_str() {
        "system" => println!("⚙ {}", message.content),
        "user" => println!("👤 {}", truncate(&message.content)),
        "assistant" => println!("💬 {}", truncate(&message.content)),
        "tool" => {
            println!("🔧 {}", message.tool_name.as_deref().unwrap_or("tool"));
            for line in message.content.lines() {
                if !line.trim().is_empty() {
                    println!("   {line}");
                }
            }
        }
        _ => {}
    }
}

/// Token accounting for one model call.
pub fn print_api_usage(tokens_in: u64, tokens_out: u64) {
    println!("⇄ API Request [⬆ {tokens_in} / ⬇ {tokens_out}]");
}

/// Startup listing of every discovered tool and whether the agent may call
/// it. Built-ins are always callable; MCP tools only when allow-listed.
pub fn print_tools(
    definitions: &[ToolDefinition],
    allowed_tools: &[String],
    builtin_names: &[String],
) {
    let mut names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
    names.sort_unstable();

    println!("Found {} tools:", names.len());
    for name in names {
        let callable = builtin_names.iter().any(|builtin| builtin == name)
            || allowed_tools.iter().any(|allowed| allowed == name);
        if callable {
            println!("✓ {name}");
        } else {
            println!("✗ {name}");
        }
    }
}
