//! User-facing error messages.

use crate::error::AgentError;

/// Map an [`AgentError`] to a help string with actionable guidance.
pub fn format_error_help(err: &AgentError) -> String {
    match err {
        AgentError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Check GEMINI_API_KEY in your environment or .env")
        }
        AgentError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your .env, config file or flags")
        }
        AgentError::ToolHost(msg) => {
            format!("Tool host failed: {msg}. Check that the server command starts an MCP server on stdio")
        }
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_mentions_key() {
        let help = format_error_help(&AgentError::Authentication("key rejected".into()));
        assert!(help.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn tool_host_error_mentions_server() {
        let help = format_error_help(&AgentError::ToolHost("transport closed".into()));
        assert!(help.contains("transport closed"));
        assert!(help.contains("MCP server"));
    }

    #[test]
    fn other_errors_fall_through_to_display() {
        let help = format_error_help(&AgentError::Timeout(10_000));
        assert_eq!(help, "Timeout after 10000ms");
    }
}
