//! Tool catalog and dispatch.
//!
//! Exposes the workspace browsing tools and `execute_sql` behind a single
//! name-based dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod filter;
pub mod handlers;
pub mod params;

pub use definitions::{find_tool, tool_definitions, ToolDef, ToolDefinition, ToolKind, TOOLS};
pub use dispatcher::{Dispatcher, ToolContent, ToolResponse};
pub use filter::TableFilter;
pub use handlers::TableListing;
pub use params::{
    ExecuteSqlParams, GetTableParams, ListSchemasParams, ListTablesParams, ToolArguments,
};
