//! Tool host backed by an MCP server spawned over stdio.

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientInfo, ProtocolVersion},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::TokioChildProcess,
};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AgentError;
use crate::tools::{ContentItem, ToolDescriptor, ToolHost, ToolOutput};

pub type McpRunningService = RunningService<RoleClient, Box<dyn DynService<RoleClient>>>;

/// A live MCP session. One request is in flight at a time.
pub struct McpToolHost {
    session: Mutex<Option<McpRunningService>>,
}

impl std::fmt::Debug for McpToolHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolHost").finish_non_exhaustive()
    }
}

impl McpToolHost {
    /// Spawn the configured server and complete the MCP handshake.
    pub async fn spawn(server: &ServerConfig) -> Result<Self, AgentError> {
        let program = server
            .command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Configuration(
                    "no tool-host command configured (set [server].command or PIPELOOP_SERVER_COMMAND)"
                        .into(),
                )
            })?;

        info!(command = %program, args = ?server.args, "starting MCP server");

        let latest = ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };
        let session = match connect(server, program, latest).await {
            Ok(session) => session,
            Err(error) if should_retry_protocol_fallback(&error) => {
                warn!("MCP server rejected latest protocol version, falling back to 2024-11-05");
                let fallback = ClientInfo {
                    protocol_version: ProtocolVersion::V_2024_11_05,
                    ..Default::default()
                };
                connect(server, program, fallback)
                    .await
                    .map_err(map_client_initialize_error)?
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        };

        Ok(Self::from_running_service(session))
    }

    /// Wrap a session whose handshake already completed.
    pub fn from_running_service(session: McpRunningService) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Shut the session down. Later calls fail with a tool host error.
    pub async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            if let Err(error) = session.cancel().await {
                warn!(error = %error, "MCP session did not shut down cleanly");
            }
        }
    }
}

async fn connect(
    server: &ServerConfig,
    program: &str,
    client_info: ClientInfo,
) -> Result<McpRunningService, ClientInitializeError> {
    let mut command = Command::new(program);
    command.args(&server.args).envs(&server.env);
    let transport = TokioChildProcess::new(command).map_err(|error| {
        ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
    })?;
    client_info.into_dyn().serve(transport).await
}

#[async_trait]
impl ToolHost for McpToolHost {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| AgentError::ToolHost("MCP session is closed".into()))?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => session
                .list_tools(None)
                .await
                .map(|page| page.tools)
                .map_err(|e| map_service_error("list_tools", e))?,
            Err(error) => return Err(map_service_error("list_tools", error)),
        };

        debug!(count = tools.len(), "listed MCP tools");
        Ok(tools.into_iter().map(map_tool_descriptor).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, AgentError> {
        let guard = self.session.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| AgentError::ToolHost("MCP session is closed".into()))?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|error| map_call_error(name, error))?;

        map_call_result(name, result)
    }
}

fn should_retry_protocol_fallback(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn map_tool_descriptor(tool: rmcp::model::Tool) -> ToolDescriptor {
    let description = tool.description.as_deref().unwrap_or_default().to_string();
    let schema = Value::Object((*tool.input_schema).clone());
    ToolDescriptor::from_schema(tool.name.to_string(), description, &schema)
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<ToolOutput, AgentError> {
    let items: Vec<ContentItem> = result
        .content
        .iter()
        .map(|item| match item.as_text() {
            Some(text) => ContentItem::text(text.text.clone()),
            None => ContentItem::raw(serde_json::to_value(item).unwrap_or(Value::Null)),
        })
        .collect();

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| {
                let text: Vec<&str> = items.iter().filter_map(|i| i.text.as_deref()).collect();
                (!text.is_empty()).then(|| text.join("\n"))
            })
            .unwrap_or_else(|| "MCP tool returned an error result".into());
        return Err(AgentError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    match (items.is_empty(), result.structured_content) {
        (true, Some(structured)) => Ok(ToolOutput::Opaque(structured)),
        _ => Ok(ToolOutput::Content(items)),
    }
}

/// Failures reported by the server for one call are tool-level; transport
/// failures mean the host is gone.
fn map_call_error(name: &str, error: ServiceError) -> AgentError {
    match error {
        ServiceError::McpError(error) => AgentError::ToolExecution {
            tool_name: name.to_string(),
            message: format!("MCP error {}: {}", error.code.0, error.message),
        },
        ServiceError::Timeout { timeout } => AgentError::ToolExecution {
            tool_name: name.to_string(),
            message: format!("timed out after {}ms", timeout.as_millis()),
        },
        other => map_service_error("call_tool", other),
    }
}

fn map_client_initialize_error(error: ClientInitializeError) -> AgentError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            AgentError::ToolHost(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => AgentError::ToolHost(format!(
            "MCP initialize transport error ({context}): {error}"
        )),
        ClientInitializeError::JsonRpcError(error) => AgentError::ToolHost(format!(
            "MCP initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => AgentError::ToolHost("MCP initialize cancelled".into()),
        other => AgentError::ToolHost(format!("MCP initialize error: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> AgentError {
    match error {
        ServiceError::McpError(error) => AgentError::ToolHost(format!(
            "{context}: MCP error {}: {}",
            error.code.0, error.message
        )),
        ServiceError::TransportSend(error) => {
            AgentError::ToolHost(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            AgentError::ToolHost(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            AgentError::ToolHost(format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            AgentError::ToolHost(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => AgentError::Timeout(timeout.as_millis() as u64),
        other => AgentError::ToolHost(format!("{context}: MCP service error: {other}")),
    }
}
