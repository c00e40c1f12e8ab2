//! Configuration system (layered: code > env > TOML file > defaults).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AgentError;
use crate::model::gemini::DEFAULT_MODEL;
use crate::model::ModelSettings;

pub const DEFAULT_MAX_ITERATIONS: usize = 3;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(10);

/// How to launch the tool-host process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// On-disk shape of the TOML config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    max_iterations: Option<usize>,
    model_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    model: Option<String>,
    base_url: Option<String>,
    generation: ModelSettings,
    guidance: Vec<String>,
    tool_delays: HashMap<String, u64>,
    server: ServerConfig,
}

/// Settings for one agent run.
#[derive(Clone)]
pub struct AgentConfig {
    /// Upper bound on dispatch-bearing rounds.
    pub max_iterations: usize,
    pub model_timeout: Duration,
    /// Abort after this many failed attempts of one round. `None` retries forever.
    pub max_consecutive_retries: Option<u32>,
    pub retry_backoff: Duration,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Sampling settings sent with every model call.
    pub generation: ModelSettings,
    /// Extra lines for the "Important" section of the system prompt.
    pub guidance: Vec<String>,
    /// Pause before invoking these tools.
    pub tool_delays: HashMap<String, Duration>,
    pub server: ServerConfig,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("max_iterations", &self.max_iterations)
            .field("model_timeout", &self.model_timeout)
            .field("max_consecutive_retries", &self.max_consecutive_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("generation", &self.generation)
            .field("guidance", &self.guidance)
            .field("tool_delays", &self.tool_delays)
            .field("server", &self.server)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            max_consecutive_retries: None,
            retry_backoff: Duration::ZERO,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            generation: ModelSettings::default(),
            guidance: Vec::new(),
            tool_delays: HashMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Defaults overridden by environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, AgentError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Full layering: TOML file (if any), then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let _ = dotenvy::dotenv();
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AgentError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(n) = file.max_iterations {
            config.max_iterations = n;
        }
        if let Some(secs) = file.model_timeout_secs {
            config.model_timeout = Duration::from_secs(secs);
        }
        if file.max_retries.is_some() {
            config.max_consecutive_retries = file.max_retries;
        }
        if let Some(ms) = file.retry_backoff_ms {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(model) = file.model {
            config.model = model;
        }
        config.base_url = file.base_url;
        config.generation = file.generation;
        config.guidance = file.guidance;
        config.tool_delays = file
            .tool_delays
            .into_iter()
            .map(|(tool, ms)| (tool, Duration::from_millis(ms)))
            .collect();
        config.server = file.server;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("PIPELOOP_MAX_ITERATIONS") {
            self.max_iterations = parse_env("PIPELOOP_MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = lookup("PIPELOOP_MODEL_TIMEOUT_SECS") {
            self.model_timeout = Duration::from_secs(parse_env("PIPELOOP_MODEL_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("PIPELOOP_MAX_RETRIES") {
            self.max_consecutive_retries = Some(parse_env("PIPELOOP_MAX_RETRIES", &v)?);
        }
        if let Some(v) = lookup("PIPELOOP_RETRY_BACKOFF_MS") {
            self.retry_backoff = Duration::from_millis(parse_env("PIPELOOP_RETRY_BACKOFF_MS", &v)?);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(v) = lookup("PIPELOOP_TEMPERATURE") {
            self.generation.temperature = Some(parse_env("PIPELOOP_TEMPERATURE", &v)?);
        }
        if let Some(v) = lookup("PIPELOOP_MAX_OUTPUT_TOKENS") {
            self.generation.max_output_tokens =
                Some(parse_env("PIPELOOP_MAX_OUTPUT_TOKENS", &v)?);
        }
        if let Some(command) = lookup("PIPELOOP_SERVER_COMMAND") {
            self.server.command = Some(command);
        }
        if let Some(args) = lookup("PIPELOOP_SERVER_ARGS") {
            self.server.args = args.split_whitespace().map(str::to_string).collect();
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations == 0 {
            return Err(AgentError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.model_timeout.is_zero() {
            return Err(AgentError::Configuration(
                "model timeout must be greater than zero".into(),
            ));
        }
        if let Some(temperature) = self.generation.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AgentError::Configuration(format!(
                    "temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AgentError> {
    value.trim().parse().map_err(|_| {
        AgentError::Configuration(format!("{key} has an invalid value '{value}'"))
    })
}
