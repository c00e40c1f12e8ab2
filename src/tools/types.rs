//! Tool-related types: descriptors, parameter schemas, invocation output.

use serde::{Deserialize, Serialize};
use std::fmt;

use strum::EnumString;

/// Declared type of a single tool parameter.
///
/// Unrecognized type names are carried in [`ParamType::Other`] and coerce as
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    Array,
    String,
    #[strum(default)]
    Other(String),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Array => f.write_str("array"),
            Self::String => f.write_str("string"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

impl ParamType {
    /// Parse a JSON Schema `type` name. Never fails.
    pub fn from_schema_type(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| ParamType::Other(name.to_string()))
    }
}

/// One positional parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

/// A tool as advertised by the tool host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order; positional arguments bind in this order.
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ToolParameter>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Build a descriptor from an MCP-style JSON Schema input schema.
    ///
    /// Iteration order over `properties` defines the positional order. A
    /// property without a `type` is listed as `unknown` and coerced as a string.
    pub fn from_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: &serde_json::Value,
    ) -> Self {
        let parameters = input_schema
            .get("properties")
            .and_then(|v| v.as_object())
            .map(|properties| {
                properties
                    .iter()
                    .map(|(param_name, info)| {
                        let type_name = info
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("unknown");
                        ToolParameter::new(param_name, ParamType::from_schema_type(type_name))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self::new(name, description, parameters)
    }

    /// Render the signature part of the capability listing,
    /// e.g. `add(a: integer, b: integer)`.
    pub fn signature(&self) -> String {
        let params = if self.parameters.is_empty() {
            "no parameters".to_string()
        } else {
            self.parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, p.param_type))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{}({})", self.name, params)
    }
}

/// One item of structured tool content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Text payload, when the item is textual.
    pub text: Option<String>,
    /// The item as the tool host reported it.
    pub raw: serde_json::Value,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: serde_json::json!({ "type": "text", "text": text }),
            text: Some(text),
        }
    }

    pub fn raw(raw: serde_json::Value) -> Self {
        Self { text: None, raw }
    }
}

/// Result of a single tool invocation as returned by a [`ToolHost`](super::ToolHost).
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The result exposed a content sequence.
    Content(Vec<ContentItem>),
    /// Anything else; only its string form is observable.
    Opaque(serde_json::Value),
}
