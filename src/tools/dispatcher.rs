//! Tool dispatch.
//!
//! Looks the tool up in the definition table, validates its arguments into a
//! typed request and invokes the matching handler.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::definitions::{find_tool, ToolKind};
use super::handlers;
use super::params::{
    ExecuteSqlParams, GetTableParams, ListSchemasParams, ListTablesParams, ToolArguments,
};
use crate::client::WorkspaceClient;
use crate::error::{McpError, Result};
use crate::statement::{ProgressSink, StatementExecutor};

/// Routes tool calls to their handlers.
///
/// Holds the workspace client shared by every invocation. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn WorkspaceClient>,
    executor: StatementExecutor,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn WorkspaceClient>, executor: StatementExecutor) -> Self {
        Self { client, executor }
    }

    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    /// Invokes a tool by name and returns its JSON payload.
    ///
    /// Arguments are fully validated before any remote call. `progress` and
    /// `cancel` are only consulted by `execute_sql`.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let tool =
            find_tool(name).ok_or_else(|| McpError::validation(format!("unknown tool '{name}'")))?;
        let args = ToolArguments::from_value(arguments)?;
        let client = self.client.as_ref();

        debug!(tool = name, "Dispatching tool call");
        match tool.kind {
            ToolKind::ListCatalogs => to_json(handlers::list_catalogs(client).await?),
            ToolKind::ListSchemas => {
                let params = ListSchemasParams::parse(&args)?;
                to_json(handlers::list_schemas(client, &params).await?)
            }
            ToolKind::ListTables => {
                let params = ListTablesParams::parse(&args)?;
                to_json(handlers::list_tables(client, &params).await?)
            }
            ToolKind::GetTable => {
                let params = GetTableParams::parse(&args)?;
                to_json(handlers::get_table(client, &params).await?)
            }
            ToolKind::ExecuteSql => {
                let request = ExecuteSqlParams::parse(&args)?.into_request();
                info!(
                    timeout_secs = request.timeout.as_secs(),
                    row_cap = request.row_cap,
                    "Executing SQL statement"
                );
                let result = self
                    .executor
                    .execute(client, &request, progress, cancel)
                    .await?;
                to_json(result)
            }
            ToolKind::ListWarehouses => to_json(handlers::list_warehouses(client).await?),
        }
    }
}

fn to_json<T: Serialize>(payload: T) -> Result<Value> {
    serde_json::to_value(payload)
        .map_err(|e| McpError::internal(format!("failed to serialize tool result: {e}")))
}

/// A text content block in a tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

/// The result envelope returned for a tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
}

impl ToolResponse {
    /// Wraps a successful payload as compact JSON text.
    pub fn success(payload: &Value) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text",
                text: payload.to_string(),
            }],
            is_error: false,
        }
    }

    /// Renders an error as "<category>: <message>" followed by its causes.
    pub fn error(err: &McpError) -> Self {
        let mut text = format!("{}: {}", err.category(), err);
        for cause in err.cause_chain() {
            text.push_str("\ncaused by: ");
            text.push_str(&cause);
        }
        Self {
            content: vec![ToolContent {
                content_type: "text",
                text,
            }],
            is_error: true,
        }
    }

    pub fn from_result(result: &Result<Value>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(err) => Self::error(err),
        }
    }

    /// Returns the text of the first content block.
    pub fn text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}
