//! Wire types for the Databricks REST API.
//!
//! Descriptor types keep unknown fields in a flattened map so that forwarding
//! them back to the caller is not lossy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A Unity Catalog catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A schema inside a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaInfo {
    pub fn new(catalog: impl Into<String>, name: impl Into<String>) -> Self {
        let catalog = catalog.into();
        let name = name.into();
        Self {
            full_name: Some(format!("{catalog}.{name}")),
            catalog_name: Some(catalog),
            name,
            ..Default::default()
        }
    }
}

/// A column as described by the table metadata endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A table, view or other securable in a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<TableColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableInfo {
    pub fn new(catalog: &str, schema: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: Some(format!("{catalog}.{schema}.{name}")),
            catalog_name: Some(catalog.to_string()),
            schema_name: Some(schema.to_string()),
            table_type: Some("MANAGED".to_string()),
            name,
            ..Default::default()
        }
    }
}

/// A SQL warehouse (compute endpoint).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WarehouseInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            state: Some("RUNNING".to_string()),
            ..Default::default()
        }
    }
}

/// Query for a single page of the table listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListTablesRequest {
    pub catalog_name: String,
    pub schema_name: String,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
    pub omit_columns: bool,
    pub omit_properties: bool,
}

/// One page of the table listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablesPage {
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Request body when submitting a SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteStatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>, // "INLINE" or "EXTERNAL_LINKS"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>, // "JSON_ARRAY", "ARROW_STREAM", or "CSV"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<String>, // e.g. "5s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_wait_timeout: Option<String>, // "CONTINUE" or "CANCEL"
}

/// Lifecycle state of a submitted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

impl StatementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Closed => "CLOSED",
        }
    }

    /// Returns true while the statement may still change state.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error detail reported by the service for a failed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Status object returned with every statement response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementStatus {
    pub state: StatementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

/// A column in the result manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u32>,
    #[serde(default)]
    pub columns: Vec<ResultColumn>,
}

/// Manifest with schema & chunk metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ResultSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunk_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

/// One chunk of inline `JSON_ARRAY` result data.
///
/// Returned embedded in a succeeded statement response and by the chunk
/// endpoint. An absent `next_chunk_index` means there are no more chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_array: Option<Vec<Vec<Option<String>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chunk_index: Option<u32>,
}

/// Response body for the statement execution endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    pub status: StatementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ResultManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statement_state_wire_names() {
        let state: StatementState = serde_json::from_str("\"SUCCEEDED\"").unwrap();
        assert_eq!(state, StatementState::Succeeded);
        assert_eq!(
            serde_json::to_string(&StatementState::Canceled).unwrap(),
            "\"CANCELED\""
        );
    }

    #[test]
    fn test_in_progress_states() {
        assert!(StatementState::Pending.is_in_progress());
        assert!(StatementState::Running.is_in_progress());
        assert!(!StatementState::Succeeded.is_in_progress());
        assert!(!StatementState::Failed.is_in_progress());
        assert!(!StatementState::Canceled.is_in_progress());
        assert!(!StatementState::Closed.is_in_progress());
    }

    #[test]
    fn test_parse_succeeded_response() {
        let body = r#"{
            "statement_id": "01ef-abc",
            "status": {"state": "SUCCEEDED"},
            "manifest": {
                "format": "JSON_ARRAY",
                "schema": {"column_count": 1, "columns": [
                    {"name": "1", "type_name": "INT", "type_text": "INT", "position": 0}
                ]},
                "total_chunk_count": 1,
                "total_row_count": 1
            },
            "result": {"chunk_index": 0, "row_offset": 0, "row_count": 1, "data_array": [["1"]]}
        }"#;
        let resp: StatementResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.statement_id.as_deref(), Some("01ef-abc"));
        assert_eq!(resp.status.state, StatementState::Succeeded);
        let columns = resp.manifest.unwrap().schema.unwrap().columns;
        assert_eq!(columns[0].name, "1");
        let result = resp.result.unwrap();
        assert_eq!(result.data_array, Some(vec![vec![Some("1".to_string())]]));
        assert_eq!(result.next_chunk_index, None);
    }

    #[test]
    fn test_parse_failed_status_with_error() {
        let body = r#"{
            "statement_id": "01ef-def",
            "status": {"state": "FAILED", "error": {"error_code": "BAD_REQUEST", "message": "syntax error"}}
        }"#;
        let resp: StatementResponse = serde_json::from_str(body).unwrap();
        let error = resp.status.error.unwrap();
        assert_eq!(error.error_code.as_deref(), Some("BAD_REQUEST"));
        assert_eq!(error.message, "syntax error");
    }

    #[test]
    fn test_null_cells_survive() {
        let body = r#"{"data_array": [["a", null]], "next_chunk_index": 2}"#;
        let data: ResultData = serde_json::from_str(body).unwrap();
        assert_eq!(
            data.data_array,
            Some(vec![vec![Some("a".to_string()), None]])
        );
        assert_eq!(data.next_chunk_index, Some(2));
    }

    #[test]
    fn test_table_info_keeps_unknown_fields() {
        let body = r#"{"name": "orders", "catalog_name": "main", "storage_location": "s3://x"}"#;
        let table: TableInfo = serde_json::from_str(body).unwrap();
        assert_eq!(table.name, "orders");
        assert_eq!(
            table.extra.get("storage_location"),
            Some(&Value::String("s3://x".to_string()))
        );
        let back = serde_json::to_value(&table).unwrap();
        assert_eq!(back["storage_location"], "s3://x");
    }

    #[test]
    fn test_execute_request_skips_unset_fields() {
        let request = ExecuteStatementRequest {
            statement: "SELECT 1".to_string(),
            warehouse_id: "wh".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"statement": "SELECT 1", "warehouse_id": "wh"})
        );
    }
}
