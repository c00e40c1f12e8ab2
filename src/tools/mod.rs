//! Tool catalog, parameter schemas and argument coercion.

pub mod catalog;
pub mod coerce;
pub mod host;
pub mod types;

pub use catalog::ToolCatalog;
pub use coerce::{bind_arguments, coerce, ArgValue, CoercedArguments};
pub use host::ToolHost;
pub use types::{ContentItem, ParamType, ToolDescriptor, ToolOutput, ToolParameter};
