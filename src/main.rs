//! pipeloop CLI binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pipeloop::agent::{ControllerOptions, IterationController, RunEvent, RunEventPayload, RunOutcome};
use pipeloop::cli::errors::format_error_help;
use pipeloop::cli::{Cli, Commands, RunArgs};
use pipeloop::config::AgentConfig;
use pipeloop::error::AgentError;
use pipeloop::mcp::McpToolHost;
use pipeloop::model::GeminiBackend;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeloop=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => handle_run(args).await,
    };

    match result {
        Ok(RunOutcome::Terminated { value }) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Aborted { reason }) => {
            eprintln!("Aborted: {reason}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {}", format_error_help(&e));
            ExitCode::FAILURE
        }
    }
}

async fn handle_run(args: RunArgs) -> Result<RunOutcome, AgentError> {
    let config = args.apply_to(AgentConfig::load(args.config.as_deref())?);
    config.validate()?;

    let api_key = config.api_key.clone().unwrap_or_default();
    let mut backend =
        GeminiBackend::new(config.model.clone(), api_key)?.with_settings(config.generation.clone());
    if let Some(base_url) = &config.base_url {
        backend = backend.with_base_url(base_url.clone());
    }

    let host = Arc::new(McpToolHost::spawn(&config.server).await?);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let sink = Arc::new(|event: RunEvent| match &event.payload {
        RunEventPayload::ToolCall { command } => {
            eprintln!("-> {}", serde_json::to_string(command).unwrap_or_default());
        }
        RunEventPayload::Observation { observation, .. } => {
            eprintln!("<- {}", observation.flatten());
        }
        _ => {}
    });
    let options = ControllerOptions::default()
        .with_event_sink(sink)
        .with_cancellation(cancel);

    let result = match IterationController::connect(config, Arc::new(backend), host.clone(), options).await {
        Ok(controller) => controller.run(&args.goal).await,
        Err(e) => Err(e),
    };
    host.close().await;

    Ok(result?.outcome)
}
