//! Tool catalog fetched once per run.

use tracing::info;

use super::host::ToolHost;
use super::types::ToolDescriptor;
use crate::error::AgentError;

/// Immutable snapshot of the tools a host exposes.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Build a catalog from descriptors. An empty list is rejected.
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self, AgentError> {
        if tools.is_empty() {
            return Err(AgentError::ToolHost("tool host exposes no tools".into()));
        }
        Ok(Self { tools })
    }

    /// Fetch the catalog from a tool host. Any failure is fatal to the run.
    pub async fn fetch(host: &dyn ToolHost) -> Result<Self, AgentError> {
        let tools = host.list_tools().await.map_err(|err| match err {
            AgentError::ToolHost(message) => AgentError::ToolHost(message),
            other => AgentError::ToolHost(format!("failed to list tools: {other}")),
        })?;
        info!(count = tools.len(), "retrieved tool catalog");
        Self::new(tools)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render the 1-indexed capability listing used in the system prompt.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .enumerate()
            .map(|(i, tool)| format!("{}. {} - {}", i + 1, tool.signature(), tool.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{ParamType, ToolOutput, ToolParameter};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value};

    struct FixedHost(Result<Vec<ToolDescriptor>, String>);

    #[async_trait]
    impl ToolHost for FixedHost {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, AgentError> {
            self.0
                .clone()
                .map_err(|message| AgentError::Io(std::io::Error::other(message)))
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: Map<String, Value>,
        ) -> Result<ToolOutput, AgentError> {
            Ok(ToolOutput::Opaque(Value::Null))
        }
    }

    fn sample_tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "add",
                "Add two numbers",
                vec![
                    ToolParameter::new("a", ParamType::Integer),
                    ToolParameter::new("b", ParamType::Integer),
                ],
            ),
            ToolDescriptor::new("open_paint", "Open Microsoft Paint", vec![]),
            ToolDescriptor::new(
                "add_list",
                "Add all numbers in a list",
                vec![ToolParameter::new("l", ParamType::Array)],
            ),
        ]
    }

    #[test]
    fn describe_renders_numbered_signatures() {
        let catalog = ToolCatalog::new(sample_tools()).unwrap();
        assert_eq!(
            catalog.describe(),
            "1. add(a: integer, b: integer) - Add two numbers\n\
             2. open_paint(no parameters) - Open Microsoft Paint\n\
             3. add_list(l: array) - Add all numbers in a list"
        );
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = ToolCatalog::new(Vec::new()).unwrap_err();
        assert!(matches!(err, AgentError::ToolHost(_)));
    }

    #[tokio::test]
    async fn fetch_failure_is_a_tool_host_error() {
        let host = FixedHost(Err("broken pipe".into()));
        let err = ToolCatalog::fetch(&host).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolHost(message) if message.contains("broken pipe")));
    }

    #[tokio::test]
    async fn fetch_resolves_tools_by_name() {
        let host = FixedHost(Ok(sample_tools()));
        let catalog = ToolCatalog::fetch(&host).await.unwrap();
        assert_eq!(catalog.names(), ["add", "open_paint", "add_list"]);
        assert!(catalog.get("open_paint").is_some());
        assert!(catalog.get("paint").is_none());
    }
}
