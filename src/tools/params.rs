//! Typed tool parameters.
//!
//! Raw JSON arguments are validated here, before any remote call is made.

use serde_json::{Map, Value};
use std::time::Duration;

use super::definitions::{
    DEFAULT_EXECUTION_TIMEOUT_SECS, DEFAULT_MAX_RESULTS, DEFAULT_MAX_ROWS, DEFAULT_OMIT_COLUMNS,
    DEFAULT_OMIT_PROPERTIES, DEFAULT_TABLE_NAME_PATTERN,
};
use crate::error::{McpError, Result};
use crate::statement::StatementRequest;

/// The JSON object passed as a tool's `arguments`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    /// Wraps raw arguments. Absent or null arguments are treated as empty.
    pub fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(values)) => Ok(Self { values }),
            Some(other) => Err(McpError::validation(format!(
                "tool arguments must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Returns a present, non-null argument.
    fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, name: &str) -> Result<String> {
        self.optional_str(name)?.ok_or_else(|| {
            McpError::validation(format!("missing required parameter '{name}'"))
        })
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(type_error(name, "a string", other)),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(type_error(name, "a boolean", other)),
        }
    }

    /// Reads a non-negative integer. Integral floats such as `60.0` are
    /// accepted since some clients send every number as a float.
    pub fn optional_u64(&self, name: &str) -> Result<Option<u64>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let Value::Number(number) = value else {
            return Err(type_error(name, "a non-negative integer", value));
        };

        if let Some(n) = number.as_u64() {
            return Ok(Some(n));
        }
        match number.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
            _ => Err(McpError::validation(format!(
                "parameter '{name}' must be a non-negative integer, got {number}"
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(name: &str, expected: &str, got: &Value) -> McpError {
    McpError::validation(format!(
        "parameter '{name}' must be {expected}, got {}",
        json_type(got)
    ))
}

/// Arguments for `list_schemas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSchemasParams {
    pub catalog: String,
}

impl ListSchemasParams {
    pub fn parse(args: &ToolArguments) -> Result<Self> {
        Ok(Self {
            catalog: args.required_str("catalog")?,
        })
    }
}

/// Arguments for `list_tables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTablesParams {
    pub catalog: String,
    pub schema: String,
    pub table_name_pattern: String,
    pub omit_properties: bool,
    pub omit_columns: bool,
    /// 0 means no cap.
    pub max_results: u64,
}

impl ListTablesParams {
    pub fn parse(args: &ToolArguments) -> Result<Self> {
        Ok(Self {
            catalog: args.required_str("catalog")?,
            schema: args.required_str("schema")?,
            table_name_pattern: args
                .optional_str("table_name_pattern")?
                .unwrap_or_else(|| DEFAULT_TABLE_NAME_PATTERN.to_string()),
            omit_properties: args
                .optional_bool("omit_properties")?
                .unwrap_or(DEFAULT_OMIT_PROPERTIES),
            omit_columns: args
                .optional_bool("omit_columns")?
                .unwrap_or(DEFAULT_OMIT_COLUMNS),
            max_results: args
                .optional_u64("max_results")?
                .unwrap_or(DEFAULT_MAX_RESULTS),
        })
    }
}

/// Arguments for `get_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTableParams {
    pub full_name: String,
}

impl GetTableParams {
    pub fn parse(args: &ToolArguments) -> Result<Self> {
        let full_name = args.required_str("full_name")?;
        let parts: Vec<&str> = full_name.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(McpError::validation(format!(
                "parameter 'full_name' must have the form 'catalog.schema.table', got '{full_name}'"
            )));
        }
        Ok(Self { full_name })
    }
}

/// Arguments for `execute_sql`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteSqlParams {
    pub statement: String,
    pub execution_timeout_seconds: u64,
    pub max_rows: u64,
    pub warehouse_id: String,
}

impl ExecuteSqlParams {
    pub fn parse(args: &ToolArguments) -> Result<Self> {
        let statement = args.required_str("statement")?;
        if statement.trim().is_empty() {
            return Err(McpError::validation("parameter 'statement' must not be empty"));
        }

        Ok(Self {
            statement,
            execution_timeout_seconds: args
                .optional_u64("execution_timeout_seconds")?
                .unwrap_or(DEFAULT_EXECUTION_TIMEOUT_SECS),
            max_rows: args.optional_u64("max_rows")?.unwrap_or(DEFAULT_MAX_ROWS),
            warehouse_id: args.optional_str("warehouse_id")?.unwrap_or_default(),
        })
    }

    pub fn into_request(self) -> StatementRequest {
        StatementRequest {
            statement: self.statement,
            row_cap: self.max_rows,
            timeout: Duration::from_secs(self.execution_timeout_seconds),
            warehouse_id: Some(self.warehouse_id).filter(|id| !id.is_empty()),
        }
    }
}
