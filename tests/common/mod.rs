//! Shared test helpers: a scripted model backend and an in-memory tool host.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use pipeloop::error::AgentError;
use pipeloop::model::ModelBackend;
use pipeloop::tools::{ContentItem, ToolDescriptor, ToolHost, ToolOutput};

/// One scripted model reply.
pub enum Reply {
    Text(String),
    Error(AgentError),
    /// Sleep before answering, to trip the invoker timeout.
    Slow(Duration, String),
}

/// A model backend that returns queued replies in order.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: "I am not sure.".to_string(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply returned once the queue is empty.
    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = text.to_string();
        self
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Text(text.to_string()));
        self
    }

    pub fn fail(self, error: AgentError) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Error(error));
        self
    }

    pub fn slow(self, delay: Duration, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Slow(delay, text.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Error(error)) => Err(error),
            Some(Reply::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Ok(self.fallback.clone()),
        }
    }
}

/// The math tools used throughout the loop tests.
pub fn math_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::from_schema(
            "add",
            "Add two numbers",
            &json!({
                "type": "object",
                "properties": { "a": { "type": "integer" }, "b": { "type": "integer" } }
            }),
        ),
        ToolDescriptor::from_schema(
            "strings_to_chars_to_int",
            "Return the ASCII values of the characters in a word",
            &json!({
                "type": "object",
                "properties": { "string": { "type": "string" } }
            }),
        ),
        ToolDescriptor::from_schema(
            "int_list_to_exponential_sum",
            "Return sum of exponentials of numbers in a list",
            &json!({
                "type": "object",
                "properties": { "int_list": { "type": "array" } }
            }),
        ),
        ToolDescriptor::from_schema("ping", "Liveness check", &json!({ "type": "object" })),
    ]
}

/// An in-process tool host implementing [`math_tools`].
pub struct InMemoryToolHost {
    tools: Vec<ToolDescriptor>,
    calls: Mutex<Vec<(String, Value)>>,
    list_error: Option<String>,
}

impl InMemoryToolHost {
    pub fn new() -> Self {
        Self {
            tools: math_tools(),
            calls: Mutex::new(Vec::new()),
            list_error: None,
        }
    }

    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::new()
        }
    }

    /// A host whose catalog listing always fails.
    pub fn unreachable(message: &str) -> Self {
        Self {
            list_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolHost for InMemoryToolHost {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        match &self.list_error {
            Some(message) => Err(AgentError::ToolHost(message.clone())),
            None => Ok(self.tools.clone()),
        }
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

        let text = |s: String| -> Result<ToolOutput, AgentError> {
            Ok(ToolOutput::Content(vec![ContentItem::text(s)]))
        };
        match name {
            "add" => {
                let a = arguments["a"].as_i64().unwrap_or_default();
                let b = arguments["b"].as_i64().unwrap_or_default();
                text((a + b).to_string())
            }
            "strings_to_chars_to_int" => {
                let word = arguments["string"].as_str().unwrap_or_default();
                Ok(ToolOutput::Content(
                    word.chars()
                        .map(|c| ContentItem::text((c as u32).to_string()))
                        .collect(),
                ))
            }
            "int_list_to_exponential_sum" => {
                let sum: f64 = arguments["int_list"]
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_i64).map(|i| (i as f64).exp()).sum())
                    .unwrap_or_default();
                text(sum.to_string())
            }
            "ping" => Ok(ToolOutput::Opaque(json!("pong"))),
            other => Err(AgentError::ToolExecution {
                tool_name: other.to_string(),
                message: "no such tool".into(),
            }),
        }
    }
}
