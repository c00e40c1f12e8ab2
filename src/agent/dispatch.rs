//! Tool dispatch and result normalization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::tools::{bind_arguments, ToolCatalog, ToolHost, ToolOutput};

/// Flattened textual result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub items: Vec<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl Observation {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            is_error: false,
        }
    }

    /// A single-element observation describing a failed dispatch.
    pub fn error(err: &AgentError) -> Self {
        Self {
            items: vec![format!("Error: {err}")],
            is_error: true,
        }
    }

    /// Items joined by single spaces, as fed into the next prompt.
    pub fn flatten(&self) -> String {
        self.items.join(" ")
    }
}

/// Normalize a tool host result into an observation.
pub fn normalize(output: ToolOutput) -> Observation {
    match output {
        ToolOutput::Content(items) => Observation::new(
            items
                .into_iter()
                .map(|item| item.text.unwrap_or_else(|| value_to_string(&item.raw)))
                .collect(),
        ),
        ToolOutput::Opaque(value) => Observation::new(vec![value_to_string(&value)]),
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolves tool calls against the catalog and invokes the tool host.
pub struct Dispatcher {
    catalog: ToolCatalog,
    host: Arc<dyn ToolHost>,
    settle_delays: HashMap<String, Duration>,
}

impl Dispatcher {
    pub fn new(catalog: ToolCatalog, host: Arc<dyn ToolHost>) -> Self {
        Self {
            catalog,
            host,
            settle_delays: HashMap::new(),
        }
    }

    /// Wait this long before invoking the named tools.
    pub fn with_settle_delays(mut self, delays: HashMap<String, Duration>) -> Self {
        self.settle_delays = delays;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Resolve, coerce, invoke and normalize a single tool call.
    pub async fn dispatch(&self, name: &str, raw_args: &[String]) -> Result<Observation, AgentError> {
        let descriptor = self.catalog.get(name).ok_or_else(|| {
            debug!(tool = %name, available = ?self.catalog.names(), "unknown tool");
            AgentError::UnknownTool(name.to_string())
        })?;

        let arguments = bind_arguments(descriptor, raw_args)?;
        debug!(tool = %name, arguments = ?arguments, "coerced arguments");

        if let Some(delay) = self.settle_delays.get(name) {
            debug!(tool = %name, delay_ms = delay.as_millis() as u64, "waiting before tool call");
            tokio::time::sleep(*delay).await;
        }

        info!(tool = %name, "calling tool");
        let output = self.host.call_tool(name, arguments.into_json()).await?;
        let observation = normalize(output);
        debug!(tool = %name, result = %observation.flatten(), "tool call completed");
        Ok(observation)
    }

    /// Like [`Dispatcher::dispatch`], but dispatch and tool failures become an
    /// error observation. Only tool host failures propagate.
    pub async fn observe(&self, name: &str, raw_args: &[String]) -> Result<Observation, AgentError> {
        match self.dispatch(name, raw_args).await {
            Ok(observation) => Ok(observation),
            Err(err) if err.is_observable() => {
                warn!(tool = %name, error = %err, "tool call failed");
                Ok(Observation::error(&err))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ContentItem, ParamType, ToolDescriptor, ToolParameter};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<(String, Value)>>,
        fail_with: Option<fn() -> AgentError>,
    }

    #[async_trait]
    impl ToolHost for RecordingHost {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Map<String, Value>,
        ) -> Result<ToolOutput, AgentError> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), Value::Object(arguments.clone())));
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let a = arguments.get("a").and_then(Value::as_i64).unwrap_or_default();
            let b = arguments.get("b").and_then(Value::as_i64).unwrap_or_default();
            Ok(ToolOutput::Content(vec![ContentItem::text((a + b).to_string())]))
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::new(vec![ToolDescriptor::new(
            "add",
            "Add two numbers",
            vec![
                ToolParameter::new("a", ParamType::Integer),
                ToolParameter::new("b", ParamType::Integer),
            ],
        )])
        .unwrap()
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_content_items_in_order() {
        let observation = normalize(ToolOutput::Content(vec![
            ContentItem::text("73"),
            ContentItem::raw(json!({"type": "image", "mimeType": "image/png"})),
            ContentItem::text("78"),
        ]));
        assert_eq!(observation.items[0], "73");
        assert!(observation.items[1].contains("image/png"));
        assert_eq!(observation.items[2], "78");
    }

    #[test]
    fn normalize_opaque_value_is_single_item() {
        assert_eq!(normalize(ToolOutput::Opaque(json!("done"))).items, ["done"]);
        assert_eq!(normalize(ToolOutput::Opaque(json!({"ok": true}))).items, [r#"{"ok":true}"#]);
    }

    #[tokio::test]
    async fn dispatch_coerces_and_invokes_once() {
        let host = Arc::new(RecordingHost::default());
        let dispatcher = Dispatcher::new(catalog(), host.clone());

        let observation = dispatcher.dispatch("add", &args(&["5", "3"])).await.unwrap();

        assert_eq!(observation.items, ["8"]);
        let calls = host.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("add".to_string(), json!({"a": 5, "b": 3})));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation_naming_it() {
        let host = Arc::new(RecordingHost::default());
        let dispatcher = Dispatcher::new(catalog(), host.clone());

        let err = dispatcher.dispatch("multiply", &args(&["2", "3"])).await.unwrap_err();
        assert!(matches!(&err, AgentError::UnknownTool(name) if name == "multiply"));

        let observation = dispatcher.observe("multiply", &args(&["2", "3"])).await.unwrap();
        assert!(observation.is_error);
        assert!(observation.flatten().contains("multiply"));
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn arity_and_coercion_errors_do_not_reach_the_host() {
        let host = Arc::new(RecordingHost::default());
        let dispatcher = Dispatcher::new(catalog(), host.clone());

        let short = dispatcher.observe("add", &args(&["5"])).await.unwrap();
        assert!(short.flatten().contains("Not enough parameters"));

        let bad = dispatcher.observe("add", &args(&["5", "x"])).await.unwrap();
        assert!(bad.flatten().contains("Invalid argument"));

        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_execution_errors_are_observed() {
        let host = Arc::new(RecordingHost {
            fail_with: Some(|| AgentError::ToolExecution {
                tool_name: "add".into(),
                message: "division by zero".into(),
            }),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(catalog(), host);

        let observation = dispatcher.observe("add", &args(&["1", "0"])).await.unwrap();
        assert!(observation.is_error);
        assert!(observation.flatten().contains("division by zero"));
    }

    #[tokio::test]
    async fn tool_host_failures_propagate() {
        let host = Arc::new(RecordingHost {
            fail_with: Some(|| AgentError::ToolHost("transport closed".into())),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(catalog(), host);

        let err = dispatcher.observe("add", &args(&["1", "2"])).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolHost(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_precedes_the_call() {
        let host = Arc::new(RecordingHost::default());
        let dispatcher = Dispatcher::new(catalog(), host)
            .with_settle_delays(HashMap::from([("add".to_string(), Duration::from_secs(2))]));

        let started = tokio::time::Instant::now();
        dispatcher.dispatch("add", &args(&["1", "2"])).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
