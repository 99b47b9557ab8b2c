//! Statement execution with bounded polling.
//!
//! Submits a statement, polls it to a terminal state within the caller's time
//! budget, and assembles the paginated result. Nothing here is retried: every
//! remote failure ends the invocation.

use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{ProgressEvent, ProgressSink};
use super::warehouse::resolve_warehouse;
use crate::client::{
    ExecuteStatementRequest, ResultColumn, StatementResponse, StatementService, StatementState,
    WarehouseService,
};
use crate::error::{McpError, RemoteOperation, Result};

/// Default time between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default server-side wait requested at submission.
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(5);

/// Timing knobs for statement execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Time between status polls.
    pub poll_interval: Duration,
    /// How long the service may hold the submission call open. Must be 0 or
    /// within 5..=50 seconds.
    pub initial_wait: Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_wait: DEFAULT_INITIAL_WAIT,
        }
    }
}

/// A validated request to run one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    pub statement: String,
    /// Maximum rows to return; 0 means no explicit cap.
    pub row_cap: u64,
    /// Total time budget for polling.
    pub timeout: Duration,
    /// Explicit warehouse; `None` or empty selects the first listed one.
    pub warehouse_id: Option<String>,
}

/// Fully assembled statement result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Runs statements against a workspace.
#[derive(Debug, Clone, Default)]
pub struct StatementExecutor {
    settings: ExecutionSettings,
}

impl StatementExecutor {
    pub fn new(settings: ExecutionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Number of polls that fit in the given budget.
    pub fn max_attempts(&self, timeout: Duration) -> u32 {
        let interval = self.settings.poll_interval.as_millis();
        if interval == 0 {
            return 0;
        }
        u32::try_from(timeout.as_millis() / interval).unwrap_or(u32::MAX)
    }

    /// Runs a statement to completion and returns the assembled result.
    ///
    /// Progress is reported to `progress` before every poll. When `cancel`
    /// fires, a best-effort remote cancellation is issued and
    /// `McpError::Canceled` is returned.
    pub async fn execute<C>(
        &self,
        client: &C,
        request: &StatementRequest,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ResultSet>
    where
        C: StatementService + WarehouseService + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(McpError::Canceled { state: None });
        }
        let warehouse_id = resolve_warehouse(client, request.warehouse_id.as_deref()).await?;

        if cancel.is_cancelled() {
            return Err(McpError::Canceled { state: None });
        }
        let response = self.submit(client, request, &warehouse_id).await?;
        let statement_id = response
            .statement_id
            .clone()
            .ok_or_else(|| McpError::internal("statement submission returned no statement id"))?;

        let response = self
            .poll(client, &statement_id, response, request.timeout, progress, cancel)
            .await?;

        let result = self
            .assemble(client, &statement_id, response, cancel)
            .await?;
        info!(
            statement_id = %statement_id,
            rows = result.rows.len(),
            "Statement succeeded"
        );
        Ok(result)
    }

    async fn submit<C>(
        &self,
        client: &C,
        request: &StatementRequest,
        warehouse_id: &str,
    ) -> Result<StatementResponse>
    where
        C: StatementService + ?Sized,
    {
        let body = ExecuteStatementRequest {
            statement: request.statement.clone(),
            warehouse_id: warehouse_id.to_string(),
            row_limit: (request.row_cap > 0)
                .then(|| i64::try_from(request.row_cap).unwrap_or(i64::MAX)),
            disposition: Some("INLINE".to_string()),
            format: Some("JSON_ARRAY".to_string()),
            wait_timeout: Some(format!("{}s", self.settings.initial_wait.as_secs())),
            on_wait_timeout: Some("CONTINUE".to_string()),
        };

        info!(warehouse_id, "Submitting statement");
        let response = client
            .execute_statement(&body)
            .await
            .map_err(|e| McpError::remote(RemoteOperation::Submit, e))?;

        debug!(
            statement_id = ?response.statement_id,
            state = %response.status.state,
            "Statement submitted"
        );
        Ok(response)
    }

    /// Polls until the statement leaves Pending/Running, reports an error, or
    /// the attempt budget runs out. Returns the Succeeded response.
    async fn poll<C>(
        &self,
        client: &C,
        statement_id: &str,
        mut response: StatementResponse,
        timeout: Duration,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<StatementResponse>
    where
        C: StatementService + ?Sized,
    {
        let max_attempts = self.max_attempts(timeout);
        let mut attempts = 0;

        while attempts < max_attempts
            && response.status.state.is_in_progress()
            && response.status.error.is_none()
        {
            let state = response.status.state;
            if cancel.is_cancelled() {
                return Err(self.abandon(client, statement_id, state).await);
            }

            if let Some(sink) = progress {
                let event = ProgressEvent::for_attempt(
                    attempts,
                    max_attempts,
                    self.settings.poll_interval,
                    state,
                );
                if let Err(e) = sink.emit(event).await {
                    warn!(statement_id, "Progress receiver gone: {e}");
                    self.cancel_remote(client, statement_id).await;
                    return Err(McpError::Disconnected(e.to_string()));
                }
            }

            // Cancellation wins when it lands on the same tick as the wakeup.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abandon(client, statement_id, state).await);
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            response = client
                .get_statement(statement_id)
                .await
                .map_err(|e| McpError::remote(RemoteOperation::StatusFetch, e))?;
            attempts += 1;

            debug!(
                statement_id,
                attempts,
                max_attempts,
                state = %response.status.state,
                "Polled statement status"
            );
        }

        let state = response.status.state;
        if let Some(error) = &response.status.error {
            return Err(McpError::StatementExecution {
                message: error.message.clone(),
                state,
            });
        }

        match state {
            StatementState::Succeeded => Ok(response),
            StatementState::Pending | StatementState::Running => {
                self.cancel_remote(client, statement_id).await;
                Err(McpError::Timeout {
                    budget: timeout,
                    state,
                })
            }
            StatementState::Failed | StatementState::Canceled | StatementState::Closed => {
                Err(McpError::StatementExecution {
                    message: format!("statement ended in state {state}"),
                    state,
                })
            }
        }
    }

    /// Concatenates the embedded first chunk with every following chunk.
    ///
    /// Chunks are fetched one at a time in ascending index order. A failed
    /// fetch drops everything assembled so far.
    async fn assemble<C>(
        &self,
        client: &C,
        statement_id: &str,
        response: StatementResponse,
        cancel: &CancellationToken,
    ) -> Result<ResultSet>
    where
        C: StatementService + ?Sized,
    {
        let columns = response
            .manifest
            .and_then(|m| m.schema)
            .map(|s| s.columns)
            .unwrap_or_default();

        let mut rows = Vec::new();
        let mut next_chunk = None;
        if let Some(first) = response.result {
            rows.extend(first.data_array.unwrap_or_default());
            next_chunk = first.next_chunk_index;
        }

        while let Some(index) = next_chunk.filter(|&i| i != 0) {
            if cancel.is_cancelled() {
                return Err(self
                    .abandon(client, statement_id, StatementState::Succeeded)
                    .await);
            }

            let chunk = client
                .get_result_chunk(statement_id, index)
                .await
                .map_err(|e| McpError::remote(RemoteOperation::ChunkFetch, e))?;

            if let Some(next) = chunk.next_chunk_index.filter(|&n| n != 0 && n <= index) {
                return Err(McpError::internal(format!(
                    "result chunk {index} points back to chunk {next}"
                )));
            }

            let chunk_rows = chunk.data_array.unwrap_or_default();
            debug!(statement_id, index, rows = chunk_rows.len(), "Fetched result chunk");
            rows.extend(chunk_rows);
            next_chunk = chunk.next_chunk_index;
        }

        Ok(ResultSet { columns, rows })
    }

    /// Cancels remotely and builds the caller-cancellation error.
    async fn abandon<C>(&self, client: &C, statement_id: &str, state: StatementState) -> McpError
    where
        C: StatementService + ?Sized,
    {
        info!(statement_id, "Caller canceled statement execution");
        self.cancel_remote(client, statement_id).await;
        McpError::Canceled { state: Some(state) }
    }

    /// Best-effort cancellation. Failures are logged, never surfaced.
    async fn cancel_remote<C>(&self, client: &C, statement_id: &str)
    where
        C: StatementService + ?Sized,
    {
        if let Err(e) = client.cancel_statement(statement_id).await {
            warn!(statement_id, "Failed to cancel statement: {e}");
        }
    }
}
