//! Timed, cancellable invocation of a model backend.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ModelBackend;
use crate::error::AgentError;
use crate::util::timeout::with_timeout;

/// Issues prompts to a [`ModelBackend`] one at a time.
///
/// Each call runs on its own task so a timeout can preempt it; a timed-out
/// call is aborted and its late result, if any, is dropped.
pub struct ModelInvoker {
    backend: Arc<dyn ModelBackend>,
    cancel: CancellationToken,
}

impl ModelInvoker {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            backend,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight and future invocations when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ModelBackend> {
        &self.backend
    }

    /// Send `prompt` to the backend, giving up after `timeout`.
    pub async fn invoke(&mut self, prompt: &str, timeout: Duration) -> Result<String, AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Canceled);
        }

        let backend = Arc::clone(&self.backend);
        let provider = backend.provider_name().to_string();
        let prompt = prompt.to_owned();
        let mut task = tokio::spawn(async move { backend.complete(&prompt).await });

        debug!(provider = %provider, timeout_ms = timeout.as_millis() as u64, "starting model generation");

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Canceled),
            result = with_timeout(timeout, async {
                match (&mut task).await {
                    Ok(result) => result,
                    Err(join_error) => Err(AgentError::model(
                        provider.as_str(),
                        format!("model task failed: {join_error}"),
                    )),
                }
            }) => result,
        };

        if !task.is_finished() {
            task.abort();
        }

        match &outcome {
            Ok(text) => debug!(provider = %provider, response_len = text.len(), "model generation completed"),
            Err(AgentError::Timeout(ms)) => warn!(provider = %provider, timeout_ms = ms, "model generation timed out"),
            Err(err) => warn!(provider = %provider, error = %err, "model generation failed"),
        }

        outcome
    }
}
