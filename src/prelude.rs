//! Convenience re-exports for common use.

pub use crate::agent::{
    Command, ControllerOptions, IterationController, Observation, RunOutcome, RunResult,
};
pub use crate::config::AgentConfig;
pub use crate::error::{AgentError, Result};
pub use crate::model::{GeminiBackend, ModelBackend};
pub use crate::tools::{ToolCatalog, ToolDescriptor, ToolHost, ToolOutput};
