//! Bounded iterate-or-terminate loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::command::{parse_command, Command};
use super::dispatch::Dispatcher;
use super::events::{RunEventEmitter, RunEventPayload, RunEventSink};
use super::prompt::{next_query, PromptBuilder};
use super::types::{RoundOutcome, RoundRecord, RunId, RunOutcome, RunResult, RunState};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::model::{ModelBackend, ModelInvoker};
use crate::tools::{ToolCatalog, ToolHost};

pub const MAX_ITERATIONS_REASON: &str = "max iterations reached";
pub const RETRIES_EXHAUSTED_REASON: &str = "model retries exhausted";

/// Drives one run: prompt, model call, parse, dispatch, repeat.
///
/// The tool catalog is fetched once in [`IterationController::connect`]; the
/// controller is consumed by [`IterationController::run`].
pub struct IterationController {
    run_id: RunId,
    config: AgentConfig,
    invoker: ModelInvoker,
    dispatcher: Dispatcher,
    prompt: PromptBuilder,
    emitter: RunEventEmitter,
    cancel: CancellationToken,
}

impl std::fmt::Debug for IterationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationController")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .field("tools", &self.dispatcher.catalog().names())
            .finish()
    }
}

/// Builder-style inputs for [`IterationController::connect`].
pub struct ControllerOptions {
    pub event_sink: Option<RunEventSink>,
    pub cancel: CancellationToken,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            event_sink: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl ControllerOptions {
    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl IterationController {
    /// Validate `config`, fetch the tool catalog and prepare the prompts.
    pub async fn connect(
        config: AgentConfig,
        backend: Arc<dyn ModelBackend>,
        host: Arc<dyn ToolHost>,
        options: ControllerOptions,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let catalog = ToolCatalog::fetch(host.as_ref()).await?;
        let prompt = PromptBuilder::with_guidance(&catalog, &config.guidance);
        let dispatcher =
            Dispatcher::new(catalog, host).with_settle_delays(config.tool_delays.clone());
        let invoker = ModelInvoker::new(backend).with_cancellation(options.cancel.clone());
        let run_id = Uuid::new_v4();

        Ok(Self {
            run_id,
            config,
            invoker,
            dispatcher,
            prompt,
            emitter: RunEventEmitter::new(run_id, options.event_sink),
            cancel: options.cancel,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    /// Loop rounds until a final answer, an abort, or a fatal error.
    pub async fn run(mut self, goal: &str) -> Result<RunResult, AgentError> {
        info!(
            run_id = %self.run_id,
            model = %self.invoker.backend().model_id(),
            max_iterations = self.config.max_iterations,
            "starting run"
        );
        let mut state = RunState::new(goal);

        let outcome = loop {
            match self.run_round(&mut state).await? {
                RoundOutcome::Continue => continue,
                RoundOutcome::Retry(err) => {
                    self.backoff(&err).await?;
                }
                RoundOutcome::Terminated(value) => break RunOutcome::Terminated { value },
                RoundOutcome::Aborted(reason) => break RunOutcome::Aborted { reason },
            }
        };

        info!(run_id = %self.run_id, iterations = state.iteration, outcome = ?outcome, "run finished");
        Ok(RunResult {
            run_id: self.run_id,
            outcome,
            iterations: state.iteration,
            history: state.history,
            finished_at: Utc::now(),
        })
    }

    /// One round attempt. Only fatal errors are returned as `Err`.
    pub async fn run_round(&mut self, state: &mut RunState) -> Result<RoundOutcome, AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Canceled);
        }
        if state.done {
            return Ok(match (&state.termination_value, &state.abort_reason) {
                (Some(value), _) => RoundOutcome::Terminated(value.clone()),
                (None, Some(reason)) => RoundOutcome::Aborted(reason.clone()),
                (None, None) => RoundOutcome::Aborted(MAX_ITERATIONS_REASON.to_string()),
            });
        }
        if state.iteration >= self.config.max_iterations {
            return Ok(self.abort(state, MAX_ITERATIONS_REASON));
        }

        let iteration = state.iteration + 1;
        info!(iteration, attempt = state.consecutive_retries + 1, "starting round");
        self.emitter.emit(RunEventPayload::RoundStarted {
            iteration,
            attempt: state.consecutive_retries + 1,
        });

        let prompt = self.prompt.round_prompt(&state.query);
        let command = match self.next_command(&prompt).await {
            Ok(command) => command,
            Err(err) if err.is_round_retryable() => return Ok(self.retry(state, err)),
            Err(err) => return Err(err),
        };
        state.consecutive_retries = 0;

        let (name, raw_args) = match &command {
            Command::FinalAnswer { value } => {
                info!(iteration, answer = %value, "final answer");
                state.done = true;
                state.termination_value = Some(value.clone());
                self.emitter.emit(RunEventPayload::Terminated {
                    value: value.clone(),
                });
                return Ok(RoundOutcome::Terminated(value.clone()));
            }
            Command::ToolCall { name, raw_args } => (name.clone(), raw_args.clone()),
        };

        info!(iteration, tool = %name, args = ?raw_args, "dispatching tool call");
        self.emitter.emit(RunEventPayload::ToolCall {
            command: command.clone(),
        });

        let observation = self.dispatcher.observe(&name, &raw_args).await?;
        debug!(iteration, result = %observation.flatten(), "observation recorded");
        self.emitter.emit(RunEventPayload::Observation {
            iteration,
            observation: observation.clone(),
        });

        state.query = next_query(&state.query, &observation);
        state.last_observations = vec![observation.clone()];
        state.history.push(RoundRecord {
            iteration,
            command,
            observation,
        });
        state.iteration = iteration;
        Ok(RoundOutcome::Continue)
    }

    async fn next_command(&mut self, prompt: &str) -> Result<Command, AgentError> {
        let response = self.invoker.invoke(prompt, self.config.model_timeout).await?;
        debug!(response = %response.trim(), "model response");
        self.emitter.emit(RunEventPayload::ModelResponse {
            text: response.clone(),
        });
        parse_command(&response)
    }

    fn retry(&self, state: &mut RunState, err: AgentError) -> RoundOutcome {
        state.consecutive_retries += 1;
        let iteration = state.iteration + 1;
        warn!(iteration, retries = state.consecutive_retries, error = %err, "round failed, retrying");
        self.emitter.emit(RunEventPayload::Retry {
            iteration,
            error: err.to_string(),
        });

        match self.config.max_consecutive_retries {
            Some(max) if state.consecutive_retries > max => {
                self.abort(state, RETRIES_EXHAUSTED_REASON)
            }
            _ => RoundOutcome::Retry(err),
        }
    }

    fn abort(&self, state: &mut RunState, reason: &str) -> RoundOutcome {
        warn!(iterations = state.iteration, reason, "run aborted");
        state.done = true;
        state.abort_reason = Some(reason.to_string());
        self.emitter.emit(RunEventPayload::Aborted {
            reason: reason.to_string(),
        });
        RoundOutcome::Aborted(reason.to_string())
    }

    /// Pause before re-attempting a round. A backend retry hint raises the
    /// configured backoff, never lowers it.
    async fn backoff(&self, err: &AgentError) -> Result<(), AgentError> {
        let delay = retry_delay(self.config.retry_backoff, err);
        if delay.is_zero() {
            return Ok(());
        }
        debug!(delay_ms = delay.as_millis() as u64, "waiting before retry");
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AgentError::Canceled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn retry_delay(configured: Duration, err: &AgentError) -> Duration {
    match err {
        AgentError::RateLimited {
            retry_after_ms: Some(ms),
        } => configured.max(Duration::from_millis(*ms)),
        _ => configured,
    }
}
