//! Tool host boundary -- the external process that owns and runs tools.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{ToolDescriptor, ToolOutput};
use crate::error::AgentError;

/// Trait for hosts that can list and execute tools at runtime.
///
/// Calls are issued one at a time; implementations may rely on that.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// List every tool the host exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError>;

    /// Execute a tool by name with already-coerced arguments.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AgentError>;
}
