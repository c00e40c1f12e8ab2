//! Model boundary: backends that turn a prompt into a text completion.

pub mod gemini;
pub mod invoker;

pub use gemini::GeminiBackend;
pub use invoker::ModelInvoker;

use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Sampling settings forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
pub struct ModelSettings {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

/// Core trait implemented by all model backends.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn provider_name(&self) -> &str;

    /// The model ID this backend serves.
    fn model_id(&self) -> &str;

    /// Generate a completion for a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String, AgentError>;
}
