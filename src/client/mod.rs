//! Databricks workspace client layer.
//!
//! Provides trait-based interfaces for the remote services a tool invocation
//! consumes, so the REST client and the in-memory mock can be used
//! interchangeably.

mod mock;
mod rest;
mod types;

pub use mock::{
    chunk, failed_response, status_response, succeeded_response, MockCall, MockWorkspace,
};
pub use rest::RestClient;
pub use types::{
    CatalogInfo, ExecuteStatementRequest, ListTablesRequest, ResultColumn, ResultData,
    ResultManifest, ResultSchema, SchemaInfo, ServiceError, StatementResponse, StatementState,
    StatementStatus, TableColumn, TableInfo, TablesPage, WarehouseInfo,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by the workspace client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not Found (404)")]
    NotFound,

    #[error("JSON parse error: {0}")]
    Decode(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Unity Catalog namespace browsing.
#[async_trait]
pub trait NamespaceService: Send + Sync {
    /// Lists every catalog visible to the caller.
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, ApiError>;

    /// Lists every schema in the given catalog.
    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, ApiError>;

    /// Fetches a single page of tables. Follow `next_page_token` for more.
    async fn list_tables(&self, request: &ListTablesRequest) -> Result<TablesPage, ApiError>;

    /// Looks up one table by its three-level name.
    async fn get_table(&self, full_name: &str) -> Result<TableInfo, ApiError>;
}

/// SQL warehouse discovery.
#[async_trait]
pub trait WarehouseService: Send + Sync {
    async fn list_warehouses(&self) -> Result<Vec<WarehouseInfo>, ApiError>;
}

/// The statement execution primitives.
#[async_trait]
pub trait StatementService: Send + Sync {
    /// POST /api/2.0/sql/statements
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementResponse, ApiError>;

    /// GET /api/2.0/sql/statements/{statement_id}
    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, ApiError>;

    /// GET /api/2.0/sql/statements/{statement_id}/result/chunks/{chunk_index}
    async fn get_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ResultData, ApiError>;

    /// POST /api/2.0/sql/statements/{statement_id}/cancel
    async fn cancel_statement(&self, statement_id: &str) -> Result<(), ApiError>;
}

/// Everything a tool invocation may call. Shared across concurrent calls.
pub trait WorkspaceClient: NamespaceService + WarehouseService + StatementService {}

impl<T> WorkspaceClient for T where T: NamespaceService + WarehouseService + StatementService {}
