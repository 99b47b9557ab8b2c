//! Catalog browsing integration tests.
//!
//! Exercises the namespace tools through the dispatcher.

use std::sync::Arc;

use databricks_mcp::client::{MockCall, MockWorkspace, TableInfo};
use databricks_mcp::error::McpError;
use databricks_mcp::statement::StatementExecutor;
use databricks_mcp::tools::{Dispatcher, ToolResponse};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn dispatcher(mock: MockWorkspace) -> Dispatcher {
    Dispatcher::new(Arc::new(mock), StatementExecutor::default())
}

async fn call(dispatcher: &Dispatcher, name: &str, args: Value) -> Result<Value, McpError> {
    dispatcher
        .call(name, Some(args), None, &CancellationToken::new())
        .await
}

fn schema_with(count: usize) -> MockWorkspace {
    let tables = (0..count)
        .map(|i| TableInfo::new("c", "s", format!("table_{i}")))
        .collect();
    MockWorkspace::new().with_tables(tables)
}

fn table_names(listing: &Value) -> Vec<&str> {
    listing["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_list_schemas_in_catalog() {
    let dispatcher = dispatcher(MockWorkspace::demo());

    let schemas = call(&dispatcher, "list_schemas", json!({"catalog": "main"}))
        .await
        .unwrap();

    let names: Vec<_> = schemas
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["main.default", "main.sales"]);
}

#[tokio::test]
async fn test_list_tables_max_results_two_of_five() {
    let dispatcher = dispatcher(schema_with(5));

    let listing = call(
        &dispatcher,
        "list_tables",
        json!({"catalog": "c", "schema": "s", "max_results": 2}),
    )
    .await
    .unwrap();

    assert_eq!(table_names(&listing), vec!["table_0", "table_1"]);
    assert_eq!(listing["total_count"], json!(2));
    assert_eq!(listing["truncated"], json!(true));
}

#[tokio::test]
async fn test_list_tables_default_cap_is_ten() {
    let dispatcher = dispatcher(schema_with(12).with_page_size(4));

    let listing = call(&dispatcher, "list_tables", json!({"catalog": "c", "schema": "s"}))
        .await
        .unwrap();

    assert_eq!(listing["total_count"], json!(10));
    assert_eq!(listing["truncated"], json!(true));
}

#[tokio::test]
async fn test_list_tables_never_exceeds_cap() {
    for cap in 1..=7u64 {
        let dispatcher = dispatcher(schema_with(5).with_page_size(2));

        let listing = call(
            &dispatcher,
            "list_tables",
            json!({"catalog": "c", "schema": "s", "max_results": cap}),
        )
        .await
        .unwrap();

        let returned = listing["total_count"].as_u64().unwrap();
        assert!(returned <= cap);
        assert_eq!(listing["truncated"], json!(cap < 5), "cap {cap}");
    }
}

// The name filter runs on the already-capped listing.
#[tokio::test]
async fn test_list_tables_filter_applies_after_truncation() {
    let tables = ["orders", "customers", "order_items", "products", "order_log"]
        .into_iter()
        .map(|n| TableInfo::new("c", "s", n))
        .collect();
    let dispatcher = dispatcher(MockWorkspace::new().with_tables(tables));

    let listing = call(
        &dispatcher,
        "list_tables",
        json!({
            "catalog": "c",
            "schema": "s",
            "table_name_pattern": "^order",
            "max_results": 3,
        }),
    )
    .await
    .unwrap();

    assert_eq!(table_names(&listing), vec!["orders", "order_items"]);
    assert_eq!(listing["truncated"], json!(true));
}

#[tokio::test]
async fn test_list_tables_invalid_pattern() {
    let dispatcher = dispatcher(schema_with(3));

    let err = call(
        &dispatcher,
        "list_tables",
        json!({"catalog": "c", "schema": "s", "table_name_pattern": "[unclosed"}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.category(), "Filter Error");
    assert_eq!(ToolResponse::error(&err).content.len(), 1);
}

#[tokio::test]
async fn test_list_tables_missing_schema_is_validation_error() {
    let dispatcher = dispatcher(schema_with(3));

    let err = call(&dispatcher, "list_tables", json!({"catalog": "c"}))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "missing required parameter 'schema'");
}

#[tokio::test]
async fn test_get_table_by_full_name() {
    let dispatcher = dispatcher(MockWorkspace::demo());

    let table = call(
        &dispatcher,
        "get_table",
        json!({"full_name": "main.sales.orders"}),
    )
    .await
    .unwrap();

    assert_eq!(table["name"], json!("orders"));
    assert_eq!(table["table_type"], json!("MANAGED"));
}

#[tokio::test]
async fn test_get_table_rejects_partial_name() {
    let dispatcher = dispatcher(MockWorkspace::demo());

    let err = call(&dispatcher, "get_table", json!({"full_name": "sales.orders"}))
        .await
        .unwrap_err();

    assert!(matches!(err, McpError::Validation(_)));
}

#[tokio::test]
async fn test_list_warehouses() {
    let dispatcher = dispatcher(MockWorkspace::demo());

    let warehouses = call(&dispatcher, "list_warehouses", json!({})).await.unwrap();

    assert_eq!(warehouses[0]["id"], json!("mock-warehouse"));
}

#[tokio::test]
async fn test_remote_failure_surfaces_cause() {
    let dispatcher = dispatcher(MockWorkspace::demo().fail_on(MockCall::ListCatalogs));

    let err = call(&dispatcher, "list_catalogs", json!({})).await.unwrap_err();
    let response = ToolResponse::error(&err);

    assert!(response.is_error);
    assert!(response
        .text()
        .starts_with("Remote Call Error: error listing catalogs\ncaused by: "));
}
