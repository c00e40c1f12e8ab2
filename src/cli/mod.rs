//! CLI entry point for pipeloop.

pub mod errors;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::AgentConfig;

/// Drive a reasoning model against an MCP tool host.
#[derive(Parser, Debug)]
#[command(name = "pipeloop", version, about = "Bounded agent loop over MCP tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve a goal with the configured model and tool host
    Run(RunArgs),
}

/// Arguments for `pipeloop run`.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Natural-language goal for the agent
    #[arg(short, long)]
    pub goal: String,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of tool-dispatching rounds
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Per-call model timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Gemini model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max output tokens per model call
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Tool-host executable
    #[arg(long)]
    pub server_command: Option<String>,

    /// Argument for the tool-host executable (repeatable)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    pub server_args: Vec<String>,
}

impl RunArgs {
    /// Command-line flags take precedence over every other layer.
    pub fn apply_to(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(n) = self.max_iterations {
            config.max_iterations = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.model_timeout = Duration::from_secs(secs);
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(t) = self.temperature {
            config.generation.temperature = Some(t);
        }
        if let Some(max) = self.max_tokens {
            config.generation.max_output_tokens = Some(max);
        }
        if let Some(command) = &self.server_command {
            config.server.command = Some(command.clone());
        }
        if !self.server_args.is_empty() {
            config.server.args = self.server_args.clone();
        }
        config
    }
}
