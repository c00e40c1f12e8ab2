//! MCP stdio tool host.

pub mod client;

pub use client::{McpRunningService, McpToolHost};
