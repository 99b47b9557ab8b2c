//! Integration tests for databricks-mcp.
//!
//! Most tests drive the dispatcher against the in-memory mock workspace.
//! The live tests need a real workspace: set DATABRICKS_HOST and
//! DATABRICKS_TOKEN to run them.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
