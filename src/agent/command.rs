//! Single-line command grammar spoken by the model.
//!
//! ```text
//! FUNCTION_CALL: <name>|<arg1>|<arg2>|...
//! FINAL_ANSWER: <value>
//! ```
//!
//! A `FUNCTION_CALL:` line may be surrounded by commentary; a final answer
//! must be the whole (trimmed) response.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

pub const FUNCTION_CALL_PREFIX: &str = "FUNCTION_CALL:";
pub const FINAL_ANSWER_PREFIX: &str = "FINAL_ANSWER:";

/// A parsed model command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    ToolCall { name: String, raw_args: Vec<String> },
    FinalAnswer { value: String },
}

/// Parse a full model response into a [`Command`].
pub fn parse_command(response: &str) -> Result<Command, AgentError> {
    let line = response
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(FUNCTION_CALL_PREFIX))
        .unwrap_or_else(|| response.trim());

    if let Some(rest) = line.strip_prefix(FUNCTION_CALL_PREFIX) {
        return parse_function_call(rest);
    }

    if let Some(rest) = line.strip_prefix(FINAL_ANSWER_PREFIX) {
        return Ok(Command::FinalAnswer {
            value: rest.trim().to_string(),
        });
    }

    Err(AgentError::Parse(format!(
        "expected {FUNCTION_CALL_PREFIX} or {FINAL_ANSWER_PREFIX}, got '{}'",
        preview(line)
    )))
}

fn parse_function_call(rest: &str) -> Result<Command, AgentError> {
    let mut parts = rest.split('|').map(str::trim);
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(AgentError::Parse("FUNCTION_CALL without a tool name".into()));
    }

    Ok(Command::ToolCall {
        name: name.to_string(),
        raw_args: parts.map(str::to_string).collect(),
    })
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
