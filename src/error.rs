//! Error types for databricks-mcp.
//!
//! Defines the error enum returned by every tool invocation. Every variant is
//! terminal for the invocation that produced it.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::client::{ApiError, StatementState};

/// The remote call that failed, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    ListCatalogs,
    ListSchemas,
    ListTables,
    GetTable,
    ListWarehouses,
    Submit,
    StatusFetch,
    ChunkFetch,
}

impl RemoteOperation {
    /// Returns a human-readable description of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListCatalogs => "listing catalogs",
            Self::ListSchemas => "listing schemas",
            Self::ListTables => "listing tables",
            Self::GetTable => "getting table",
            Self::ListWarehouses => "listing SQL warehouses",
            Self::Submit => "submitting statement",
            Self::StatusFetch => "getting statement status",
            Self::ChunkFetch => "getting statement result chunk",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for tool invocations.
#[derive(Error, Debug)]
pub enum McpError {
    /// Missing or malformed parameter. No remote call was attempted.
    #[error("{0}")]
    Validation(String),

    /// The table name pattern did not compile.
    #[error("invalid table name pattern '{pattern}'")]
    Filter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Warehouse listing came back empty.
    #[error("no SQL warehouses available")]
    NoWarehouseAvailable,

    /// Network, auth or service failure on a remote call.
    #[error("error {operation}")]
    RemoteCall {
        operation: RemoteOperation,
        #[source]
        source: ApiError,
    },

    /// The remote service reported the statement as failed.
    #[error("error executing the statement, current status {state}: {message}")]
    StatementExecution {
        message: String,
        state: StatementState,
    },

    /// The poll budget ran out while the statement was still in progress.
    #[error("statement did not finish within {}s, current status {state}, canceled execution", .budget.as_secs())]
    Timeout {
        budget: Duration,
        state: StatementState,
    },

    /// The caller canceled the invocation.
    #[error("statement execution canceled by caller, last status {}", .state.as_ref().map(|s| s.as_str()).unwrap_or("UNSUBMITTED"))]
    Canceled { state: Option<StatementState> },

    /// The progress sink rejected an event; the caller is gone.
    #[error("progress notification failed: {0}")]
    Disconnected(String),

    /// Configuration errors (invalid config file, missing workspace host, etc.)
    #[error("{0}")]
    Config(String),

    /// Internal errors (serialization failures, unexpected states).
    #[error("{0}")]
    Internal(String),
}

impl McpError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wraps a client error with the remote operation that produced it.
    pub fn remote(operation: RemoteOperation, source: ApiError) -> Self {
        Self::RemoteCall { operation, source }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Filter { .. } => "Filter Error",
            Self::NoWarehouseAvailable => "No Warehouse Available",
            Self::RemoteCall { operation, .. } => match operation {
                RemoteOperation::Submit => "Submission Error",
                RemoteOperation::StatusFetch => "Status Fetch Error",
                RemoteOperation::ChunkFetch => "Chunk Fetch Error",
                _ => "Remote Call Error",
            },
            Self::StatementExecution { .. } => "Statement Execution Error",
            Self::Timeout { .. } => "Timeout Error",
            Self::Canceled { .. } => "Canceled",
            Self::Disconnected(_) => "Disconnected",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the messages of the underlying causes, outermost first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        causes
    }
}

/// Result type alias using McpError.
pub type Result<T> = std::result::Result<T, McpError>;
