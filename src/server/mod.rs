//! MCP server transport.

pub mod protocol;
pub mod stdio;

pub use stdio::McpServer;
