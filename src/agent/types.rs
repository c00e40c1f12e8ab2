//! Core run types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::command::Command;
use super::dispatch::Observation;
use crate::error::AgentError;

/// Unique run identifier.
pub type RunId = Uuid;

/// One completed, dispatch-bearing round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub iteration: usize,
    pub command: Command,
    pub observation: Observation,
}

/// Mutable state of a single run, owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Number of completed dispatch-bearing rounds.
    pub iteration: usize,
    pub done: bool,
    /// Task prompt for the next round; grows with every observation.
    pub query: String,
    pub last_observations: Vec<Observation>,
    pub termination_value: Option<String>,
    /// Why the run stopped without an answer.
    pub abort_reason: Option<String>,
    pub history: Vec<RoundRecord>,
    /// Failed attempts of the current round.
    pub consecutive_retries: u32,
}

impl RunState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            query: goal.into(),
            ..Default::default()
        }
    }
}

/// Result of one round attempt.
#[derive(Debug)]
pub enum RoundOutcome {
    /// A tool was dispatched and the iteration advanced.
    Continue,
    /// The model produced a final answer.
    Terminated(String),
    /// The run cannot continue.
    Aborted(String),
    /// The attempt failed transiently; the same round is re-attempted.
    Retry(AgentError),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Terminated { value: String },
    Aborted { reason: String },
}

impl RunOutcome {
    pub fn final_answer(&self) -> Option<&str> {
        match self {
            Self::Terminated { value } => Some(value),
            Self::Aborted { .. } => None,
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    pub iterations: usize,
    pub history: Vec<RoundRecord>,
    pub finished_at: DateTime<Utc>,
}
