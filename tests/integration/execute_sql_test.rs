//! Statement execution integration tests.
//!
//! Runs `execute_sql` through the dispatcher with scripted statement
//! lifecycles. Time is paused so poll intervals advance instantly.

use std::sync::Arc;
use std::time::Duration;

use databricks_mcp::client::{
    chunk, failed_response, status_response, succeeded_response, MockWorkspace, StatementState,
    WarehouseInfo, WorkspaceClient,
};
use databricks_mcp::error::McpError;
use databricks_mcp::statement::{
    ChannelProgressSink, ExecutionSettings, ProgressEvent, StatementExecutor,
};
use databricks_mcp::tools::Dispatcher;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn workspace() -> MockWorkspace {
    MockWorkspace::new().with_warehouses(vec![
        WarehouseInfo::new("first", "Starter"),
        WarehouseInfo::new("second", "Large"),
    ])
}

/// Runs `execute_sql` and collects every progress event it emitted.
async fn execute(
    mock: Arc<MockWorkspace>,
    args: Value,
) -> (Result<Value, McpError>, Vec<ProgressEvent>) {
    let dispatcher = Dispatcher::new(mock, StatementExecutor::default());
    let (tx, mut rx) = mpsc::channel(64);
    let sink = ChannelProgressSink::new(tx);

    let result = dispatcher
        .call("execute_sql", Some(args), Some(&sink), &CancellationToken::new())
        .await;

    drop(sink);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

#[tokio::test(start_paused = true)]
async fn test_select_one_returns_without_progress() {
    let mock = Arc::new(workspace().with_submit_response(succeeded_response(
        "s1",
        &["1"],
        vec![vec!["1"]],
        None,
    )));

    let (result, events) = execute(
        Arc::clone(&mock),
        json!({"statement": "SELECT 1", "execution_timeout_seconds": 60, "max_rows": 100}),
    )
    .await;

    let value = result.unwrap();
    assert_eq!(value["columns"][0]["name"], json!("1"));
    assert_eq!(value["rows"], json!([["1"]]));
    assert!(events.is_empty());
    assert_eq!(mock.submissions()[0].row_limit, Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_pending_pending_succeeded_with_two_chunks() {
    let mock = Arc::new(
        workspace()
            .with_submit_response(status_response("s1", StatementState::Pending))
            .with_status_sequence(vec![
                status_response("s1", StatementState::Pending),
                succeeded_response("s1", &["id", "name"], vec![vec!["1", "a"]], Some(1)),
            ])
            .with_chunk(1, chunk(1, vec![vec!["2", "b"], vec!["3", "c"]], None)),
    );

    let (result, events) = execute(Arc::clone(&mock), json!({"statement": "SELECT * FROM t"})).await;

    let value = result.unwrap();
    assert_eq!(value["rows"], json!([["1", "a"], ["2", "b"], ["3", "c"]]));
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1].message,
        "Statement execution in progress (10 seconds), current status: PENDING"
    );
    assert_eq!(mock.chunk_fetches(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_null_cells_are_preserved() {
    let mut response = succeeded_response("s1", &["a", "b"], vec![], None);
    if let Some(result) = response.result.as_mut() {
        result.data_array = Some(vec![vec![Some("x".to_string()), None]]);
    }
    let mock = Arc::new(workspace().with_submit_response(response));

    let (result, _) = execute(mock, json!({"statement": "SELECT 'x', NULL"})).await;

    assert_eq!(result.unwrap()["rows"], json!([["x", null]]));
}

#[tokio::test(start_paused = true)]
async fn test_first_listed_warehouse_is_used() {
    let mock = Arc::new(workspace());

    let (result, _) = execute(
        Arc::clone(&mock),
        json!({"statement": "SELECT 1", "warehouse_id": ""}),
    )
    .await;

    result.unwrap();
    assert_eq!(mock.submissions()[0].warehouse_id, "first");
}

#[tokio::test(start_paused = true)]
async fn test_explicit_warehouse_skips_listing() {
    let mock = Arc::new(workspace());

    let (result, _) = execute(
        Arc::clone(&mock),
        json!({"statement": "SELECT 1", "warehouse_id": "second"}),
    )
    .await;

    result.unwrap();
    assert_eq!(mock.submissions()[0].warehouse_id, "second");
    assert_eq!(mock.warehouse_listing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_warehouses_available() {
    let mock = Arc::new(MockWorkspace::new());

    let (result, _) = execute(Arc::clone(&mock), json!({"statement": "SELECT 1"})).await;

    assert!(matches!(result, Err(McpError::NoWarehouseAvailable)));
    assert!(mock.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_statement() {
    let mock = Arc::new(
        workspace().with_submit_response(status_response("s1", StatementState::Running)),
    );
    let started = tokio::time::Instant::now();

    let (result, events) = execute(
        Arc::clone(&mock),
        json!({"statement": "SELECT sleep(600)", "execution_timeout_seconds": 30}),
    )
    .await;

    match result {
        Err(McpError::Timeout { budget, state }) => {
            assert_eq!(budget, Duration::from_secs(30));
            assert_eq!(state, StatementState::Running);
        }
        other => panic!("Expected Timeout, got {other:?}"),
    }
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].total, 3);
    assert_eq!(mock.cancels(), vec!["s1".to_string()]);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_message_is_reported() {
    let mock = Arc::new(
        workspace()
            .with_submit_response(status_response("s1", StatementState::Pending))
            .with_status_sequence(vec![failed_response(
                "s1",
                "[TABLE_OR_VIEW_NOT_FOUND] The table `missing` cannot be found",
            )]),
    );

    let (result, _) = execute(mock, json!({"statement": "SELECT * FROM missing"})).await;

    let err = result.unwrap_err();
    assert_eq!(err.category(), "Statement Execution Error");
    assert!(err.to_string().contains("TABLE_OR_VIEW_NOT_FOUND"));
    assert!(err.to_string().contains("FAILED"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_poll_interval() {
    let mock = Arc::new(
        workspace()
            .with_submit_response(status_response("s1", StatementState::Pending))
            .with_status_sequence(vec![
                status_response("s1", StatementState::Running),
                status_response("s1", StatementState::Running),
                succeeded_response("s1", &["n"], vec![vec!["7"]], None),
            ]),
    );
    let executor = StatementExecutor::new(ExecutionSettings {
        poll_interval: Duration::from_secs(2),
        initial_wait: Duration::ZERO,
    });
    let dispatcher = Dispatcher::new(Arc::clone(&mock) as Arc<dyn WorkspaceClient>, executor);
    let started = tokio::time::Instant::now();

    let value = dispatcher
        .call(
            "execute_sql",
            Some(json!({"statement": "SELECT 7", "execution_timeout_seconds": 10})),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(value["rows"], json!([["7"]]));
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(mock.submissions()[0].wait_timeout.as_deref(), Some("0s"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_arguments_make_no_remote_calls() {
    let mock = Arc::new(workspace());

    for args in [
        json!({}),
        json!({"statement": ""}),
        json!({"statement": "SELECT 1", "max_rows": -5}),
        json!({"statement": "SELECT 1", "execution_timeout_seconds": "sixty"}),
    ] {
        let (result, _) = execute(Arc::clone(&mock), args.clone()).await;
        assert!(
            matches!(result, Err(McpError::Validation(_))),
            "accepted {args}"
        );
    }
    assert!(mock.submissions().is_empty());
    assert_eq!(mock.warehouse_listing_count(), 0);
}
