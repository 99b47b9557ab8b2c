//! Integration tests for databricks-mcp.

pub mod catalog_test;
pub mod execute_sql_test;
pub mod live_test;
