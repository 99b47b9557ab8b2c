//! databricks-mcp - Databricks catalog browsing and SQL execution as MCP tools.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod statement;
pub mod tools;
