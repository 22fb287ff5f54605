use anyhow::{Context, Result};
use std::path::PathBuf;

/// Fallback system prompt when no prompt files are configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are autocrab, an autonomous agent. \
Work through your given tasks using the tools available to you, then call \
complete_task when everything is done.";

/// Assemble the system prompt from the configured file list.
///
/// Files are read in order and joined with blank lines. An unreadable file is
/// a startup error. An empty list yields the built-in default prompt.
pub fn load_system_prompt(files: &[PathBuf]) -> Result<String> {
    if files.is_empty() {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    }
    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt file {}", path.display()))?;
        parts.push(text.trim().to_string());
    }
    Ok(parts.join("\n\n"))
}
