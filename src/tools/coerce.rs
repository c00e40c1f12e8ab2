//! Schema-driven coercion of positional text arguments.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AgentError;

use super::types::{ParamType, ToolDescriptor};

/// A raw token converted to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Integer(i64),
    Number(f64),
    String(String),
    IntegerList(Vec<i64>),
}

impl From<ArgValue> for Value {
    fn from(value: ArgValue) -> Self {
        match value {
            ArgValue::Integer(i) => Value::from(i),
            ArgValue::Number(n) => Value::from(n),
            ArgValue::String(s) => Value::String(s),
            ArgValue::IntegerList(items) => Value::from(items),
        }
    }
}

/// Convert one raw token according to a declared parameter type.
///
/// Unknown types fall back to string coercion.
pub fn coerce(param_type: &ParamType, token: &str) -> Result<ArgValue, AgentError> {
    match param_type {
        ParamType::Integer => parse_integer(token).map(ArgValue::Integer),
        ParamType::Number => parse_number(token).map(ArgValue::Number),
        ParamType::Array => parse_integer_list(token).map(ArgValue::IntegerList),
        ParamType::String => Ok(ArgValue::String(token.to_string())),
        ParamType::Other(name) => {
            debug!(declared = %name, "coercing unknown parameter type as string");
            Ok(ArgValue::String(token.to_string()))
        }
    }
}

fn parse_integer(token: &str) -> Result<i64, AgentError> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| AgentError::InvalidArgument(format!("expected integer, got '{token}'")))
}

fn parse_number(token: &str) -> Result<f64, AgentError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| AgentError::InvalidArgument(format!("expected number, got '{token}'")))
}

fn parse_integer_list(token: &str) -> Result<Vec<i64>, AgentError> {
    let inner = token
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|element| {
            element.trim().parse::<i64>().map_err(|_| {
                AgentError::InvalidArgument(format!(
                    "expected array of integers, got element '{}' in '{token}'",
                    element.trim()
                ))
            })
        })
        .collect()
}

/// Arguments bound to a tool's parameters, keyed by parameter name in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedArguments {
    values: Vec<(String, ArgValue)>,
}

impl CoercedArguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert into the JSON object sent to the tool host.
    pub fn into_json(self) -> Map<String, Value> {
        self.values
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect()
    }
}

/// Bind positional raw arguments to a descriptor's parameters.
///
/// Fails with [`AgentError::Arity`] when the raw arguments run out before
/// every parameter is bound. Surplus arguments are ignored.
pub fn bind_arguments(
    descriptor: &ToolDescriptor,
    raw_args: &[String],
) -> Result<CoercedArguments, AgentError> {
    if raw_args.len() < descriptor.parameters.len() {
        return Err(AgentError::Arity {
            tool: descriptor.name.clone(),
            expected: descriptor.parameters.len(),
            provided: raw_args.len(),
        });
    }
    if raw_args.len() > descriptor.parameters.len() {
        debug!(
            tool = %descriptor.name,
            surplus = raw_args.len() - descriptor.parameters.len(),
            "ignoring surplus arguments"
        );
    }

    let mut values = Vec::with_capacity(descriptor.parameters.len());
    for (param, raw) in descriptor.parameters.iter().zip(raw_args) {
        let value = coerce(&param.param_type, raw).map_err(|err| match err {
            AgentError::InvalidArgument(message) => {
                AgentError::InvalidArgument(format!("{}.{}: {message}", descriptor.name, param.name))
            }
            other => other,
        })?;
        values.push((param.name.clone(), value));
    }

    Ok(CoercedArguments { values })
}
