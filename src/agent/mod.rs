//! The agent loop: command grammar, prompts, dispatch and the bounded controller.

pub mod command;
pub mod controller;
pub mod dispatch;
pub mod events;
pub mod prompt;
pub mod types;

pub use command::{parse_command, Command};
pub use controller::{ControllerOptions, IterationController};
pub use dispatch::{normalize, Dispatcher, Observation};
pub use events::{RunEvent, RunEventPayload, RunEventSink};
pub use prompt::PromptBuilder;
pub use types::{RoundOutcome, RoundRecord, RunId, RunOutcome, RunResult, RunState};
