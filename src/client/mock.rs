//! Mock workspace client for testing.
//!
//! Provides a scripted in-memory workspace: fixed namespace listings, a queue
//! of statement statuses, result chunks, injectable failures and call
//! counters.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use super::{
    ApiError, CatalogInfo, ExecuteStatementRequest, ListTablesRequest, NamespaceService,
    ResultColumn, ResultData, ResultManifest, ResultSchema, SchemaInfo, ServiceError,
    StatementResponse, StatementService, StatementState, StatementStatus, TableInfo, TablesPage,
    WarehouseInfo, WarehouseService,
};

/// A remote call the mock can be told to fail or to cancel a token during.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    ListCatalogs,
    ListSchemas,
    ListTables,
    GetTable,
    ListWarehouses,
    Submit,
    StatusFetch,
    ChunkFetch(u32),
    Cancel,
}

#[derive(Default)]
struct MockState {
    submit_response: Option<StatementResponse>,
    statuses: VecDeque<StatementResponse>,
    last_status: Option<StatementResponse>,
    chunks: HashMap<u32, ResultData>,
    failures: HashSet<MockCall>,
    cancel_triggers: HashMap<MockCall, CancellationToken>,
    submissions: Vec<ExecuteStatementRequest>,
    status_fetches: usize,
    chunk_fetches: Vec<u32>,
    cancels: Vec<String>,
    warehouse_listings: usize,
    table_requests: Vec<ListTablesRequest>,
}

/// A mock workspace client that returns predefined results.
pub struct MockWorkspace {
    catalogs: Vec<CatalogInfo>,
    schemas: Vec<SchemaInfo>,
    tables: Vec<TableInfo>,
    warehouses: Vec<WarehouseInfo>,
    page_size: usize,
    state: Mutex<MockState>,
}

impl MockWorkspace {
    /// Creates an empty mock workspace.
    pub fn new() -> Self {
        Self {
            catalogs: Vec::new(),
            schemas: Vec::new(),
            tables: Vec::new(),
            warehouses: Vec::new(),
            page_size: 50,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Creates a small populated workspace for local experimentation.
    pub fn demo() -> Self {
        let tables = ["customers", "orders", "order_items", "products"]
            .into_iter()
            .map(|name| TableInfo::new("main", "sales", name))
            .collect();

        Self::new()
            .with_catalogs(vec![CatalogInfo::new("main"), CatalogInfo::new("samples")])
            .with_schemas(vec![
                SchemaInfo::new("main", "default"),
                SchemaInfo::new("main", "sales"),
            ])
            .with_tables(tables)
            .with_warehouses(vec![WarehouseInfo::new("mock-warehouse", "Mock Serverless")])
    }

    pub fn with_catalogs(mut self, catalogs: Vec<CatalogInfo>) -> Self {
        self.catalogs = catalogs;
        self
    }

    pub fn with_schemas(mut self, schemas: Vec<SchemaInfo>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableInfo>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_warehouses(mut self, warehouses: Vec<WarehouseInfo>) -> Self {
        self.warehouses = warehouses;
        self
    }

    /// Sets how many tables a single listing page holds.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the response returned by statement submission.
    pub fn with_submit_response(self, response: StatementResponse) -> Self {
        self.lock().submit_response = Some(response);
        self
    }

    /// Queues responses for successive status fetches. Once drained, the
    /// last one is repeated.
    pub fn with_status_sequence(self, responses: Vec<StatementResponse>) -> Self {
        self.lock().statuses.extend(responses);
        self
    }

    pub fn with_chunk(self, index: u32, data: ResultData) -> Self {
        self.lock().chunks.insert(index, data);
        self
    }

    pub fn fail_on(self, failure: MockCall) -> Self {
        self.lock().failures.insert(failure);
        self
    }

    /// Cancels `token` while serving `call`; the call itself still succeeds.
    pub fn cancel_on(self, call: MockCall, token: CancellationToken) -> Self {
        self.lock().cancel_triggers.insert(call, token);
        self
    }

    /// Returns every submitted statement request, in order.
    pub fn submissions(&self) -> Vec<ExecuteStatementRequest> {
        self.lock().submissions.clone()
    }

    pub fn status_fetch_count(&self) -> usize {
        self.lock().status_fetches
    }

    /// Returns the chunk indexes fetched, in call order.
    pub fn chunk_fetches(&self) -> Vec<u32> {
        self.lock().chunk_fetches.clone()
    }

    /// Returns the statement ids cancellation was requested for.
    pub fn cancels(&self) -> Vec<String> {
        self.lock().cancels.clone()
    }

    pub fn warehouse_listing_count(&self) -> usize {
        self.lock().warehouse_listings
    }

    /// Returns every table page request, in order.
    pub fn table_requests(&self) -> Vec<ListTablesRequest> {
        self.lock().table_requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, call: MockCall) -> Result<(), ApiError> {
        let state = self.lock();
        if let Some(token) = state.cancel_triggers.get(&call) {
            token.cancel();
        }
        if state.failures.contains(&call) {
            return Err(ApiError::Api {
                status: 500,
                message: format!("injected failure: {call:?}"),
            });
        }
        Ok(())
    }
}

impl Default for MockWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NamespaceService for MockWorkspace {
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, ApiError> {
        self.check(MockCall::ListCatalogs)?;
        Ok(self.catalogs.clone())
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, ApiError> {
        self.check(MockCall::ListSchemas)?;
        Ok(self
            .schemas
            .iter()
            .filter(|s| s.catalog_name.as_deref() == Some(catalog))
            .cloned()
            .collect())
    }

    async fn list_tables(&self, request: &ListTablesRequest) -> Result<TablesPage, ApiError> {
        self.lock().table_requests.push(request.clone());
        self.check(MockCall::ListTables)?;

        let matching: Vec<&TableInfo> = self
            .tables
            .iter()
            .filter(|t| {
                t.catalog_name.as_deref() == Some(request.catalog_name.as_str())
                    && t.schema_name.as_deref() == Some(request.schema_name.as_str())
            })
            .collect();

        let offset = match &request.page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ApiError::Decode(format!("bad page token '{token}'")))?,
            None => 0,
        };
        let page_size = match request.max_results {
            Some(max) if max > 0 => self.page_size.min(max as usize),
            _ => self.page_size,
        };
        let end = (offset + page_size).min(matching.len());

        let tables = matching[offset.min(end)..end]
            .iter()
            .map(|t| {
                let mut table = (*t).clone();
                if request.omit_columns {
                    table.columns = None;
                }
                if request.omit_properties {
                    table.properties = None;
                }
                table
            })
            .collect();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(TablesPage {
            tables,
            next_page_token,
        })
    }

    async fn get_table(&self, full_name: &str) -> Result<TableInfo, ApiError> {
        self.check(MockCall::GetTable)?;
        self.tables
            .iter()
            .find(|t| t.full_name.as_deref() == Some(full_name))
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl WarehouseService for MockWorkspace {
    async fn list_warehouses(&self) -> Result<Vec<WarehouseInfo>, ApiError> {
        self.lock().warehouse_listings += 1;
        self.check(MockCall::ListWarehouses)?;
        Ok(self.warehouses.clone())
    }
}

#[async_trait]
impl StatementService for MockWorkspace {
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementResponse, ApiError> {
        let mut state = self.lock();
        state.submissions.push(request.clone());
        drop(state);
        self.check(MockCall::Submit)?;

        let mut state = self.lock();
        let response = match &state.submit_response {
            Some(response) => response.clone(),
            None => {
                // Unscripted: echo the statement back as a one-row result.
                let id = format!("mock-statement-{}", state.submissions.len());
                succeeded_response(
                    &id,
                    &["result"],
                    vec![vec![request.statement.as_str()]],
                    None,
                )
            }
        };
        state.last_status = Some(response.clone());
        Ok(response)
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, ApiError> {
        self.lock().status_fetches += 1;
        self.check(MockCall::StatusFetch)?;

        let mut state = self.lock();
        let next = match state.statuses.pop_front() {
            Some(response) => response,
            None => state
                .last_status
                .clone()
                .ok_or_else(|| ApiError::Api {
                    status: 404,
                    message: format!("unknown statement {statement_id}"),
                })?,
        };
        state.last_status = Some(next.clone());
        Ok(next)
    }

    async fn get_result_chunk(
        &self,
        _statement_id: &str,
        chunk_index: u32,
    ) -> Result<ResultData, ApiError> {
        self.lock().chunk_fetches.push(chunk_index);
        self.check(MockCall::ChunkFetch(chunk_index))?;
        self.lock()
            .chunks
            .get(&chunk_index)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn cancel_statement(&self, statement_id: &str) -> Result<(), ApiError> {
        self.lock().cancels.push(statement_id.to_string());
        self.check(MockCall::Cancel)
    }
}

/// Builds a statement response in the given state with no result payload.
pub fn status_response(statement_id: &str, state: StatementState) -> StatementResponse {
    StatementResponse {
        statement_id: Some(statement_id.to_string()),
        status: StatementStatus { state, error: None },
        manifest: None,
        result: None,
    }
}

/// Builds a FAILED statement response carrying an error detail.
pub fn failed_response(statement_id: &str, message: &str) -> StatementResponse {
    let mut response = status_response(statement_id, StatementState::Failed);
    response.status.error = Some(ServiceError {
        error_code: Some("BAD_REQUEST".to_string()),
        message: message.to_string(),
    });
    response
}

/// Builds a SUCCEEDED response with string columns and an embedded first chunk.
pub fn succeeded_response(
    statement_id: &str,
    columns: &[&str],
    rows: Vec<Vec<&str>>,
    next_chunk_index: Option<u32>,
) -> StatementResponse {
    let columns = columns
        .iter()
        .enumerate()
        .map(|(i, name)| ResultColumn {
            name: name.to_string(),
            type_name: Some("STRING".to_string()),
            type_text: Some("STRING".to_string()),
            position: Some(i as u32),
        })
        .collect::<Vec<_>>();

    let mut response = status_response(statement_id, StatementState::Succeeded);
    response.manifest = Some(ResultManifest {
        format: Some("JSON_ARRAY".to_string()),
        schema: Some(ResultSchema {
            column_count: Some(columns.len() as u32),
            columns,
        }),
        ..Default::default()
    });
    response.result = Some(chunk(0, rows, next_chunk_index));
    response
}

/// Builds a result chunk.
pub fn chunk(index: u32, rows: Vec<Vec<&str>>, next_chunk_index: Option<u32>) -> ResultData {
    let data_array: Vec<Vec<Option<String>>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(|cell| Some(cell.to_string())).collect())
        .collect();

    ResultData {
        chunk_index: Some(index),
        row_offset: None,
        row_count: Some(data_array.len() as i64),
        data_array: Some(data_array),
        next_chunk_index,
    }
}
