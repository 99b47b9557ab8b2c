//! Live workspace tests.
//!
//! These tests require a reachable Databricks workspace.
//! Set DATABRICKS_HOST and DATABRICKS_TOKEN to run them.

use std::sync::Arc;
use std::time::Duration;

use databricks_mcp::client::RestClient;
use databricks_mcp::statement::StatementExecutor;
use databricks_mcp::tools::Dispatcher;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Helper to create a dispatcher against the configured workspace.
fn get_test_dispatcher() -> Option<Dispatcher> {
    let host = std::env::var("DATABRICKS_HOST").ok()?;
    let token = std::env::var("DATABRICKS_TOKEN").ok()?;
    let client = RestClient::new(&host, &token, Duration::from_secs(60)).ok()?;
    Some(Dispatcher::new(Arc::new(client), StatementExecutor::default()))
}

#[tokio::test]
async fn test_live_list_catalogs() {
    let Some(dispatcher) = get_test_dispatcher() else {
        eprintln!("Skipping test: DATABRICKS_HOST/DATABRICKS_TOKEN not set");
        return;
    };

    let catalogs = dispatcher
        .call("list_catalogs", None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(catalogs.is_array());
}

#[tokio::test]
async fn test_live_select_one() {
    let Some(dispatcher) = get_test_dispatcher() else {
        eprintln!("Skipping test: DATABRICKS_HOST/DATABRICKS_TOKEN not set");
        return;
    };

    let result = dispatcher
        .call(
            "execute_sql",
            Some(json!({"statement": "SELECT 1", "execution_timeout_seconds": 120})),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result["rows"], json!([["1"]]));
}
