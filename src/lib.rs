//! pipeloop: a bounded agent loop for text-command models.
//!
//! A reasoning model is prompted with a catalog of tools and replies with a
//! single line, either `FUNCTION_CALL: name|arg|...` or `FINAL_ANSWER: value`.
//! The loop coerces arguments against each tool's schema, dispatches the call
//! to a tool host, feeds the result back and stops after a final answer or
//! a fixed number of rounds.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pipeloop::prelude::*;
//!
//! # async fn example() -> pipeloop::error::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let backend = GeminiBackend::new(config.model.clone(), config.api_key.clone().unwrap_or_default())?;
//! let host = Arc::new(pipeloop::mcp::McpToolHost::spawn(&config.server).await?);
//! let controller =
//!     IterationController::connect(config, Arc::new(backend), host, ControllerOptions::default()).await?;
//! let result = controller.run("Add 5 and 3").await?;
//! println!("{:?}", result.outcome);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod model;
pub mod prelude;
pub mod tools;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;
