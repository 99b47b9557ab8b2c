//! Tool definitions for declarative tool metadata.
//!
//! Every tool the server exposes is listed once in [`TOOLS`]. The table drives
//! both the advertised JSON Schema and dispatch, so a tool cannot be callable
//! without being listed or listed without being callable.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default regular expression for `list_tables`; matches everything.
pub const DEFAULT_TABLE_NAME_PATTERN: &str = ".*";
/// Whether `list_tables` leaves table properties out by default.
pub const DEFAULT_OMIT_PROPERTIES: bool = true;
/// Whether `list_tables` leaves column details out by default.
pub const DEFAULT_OMIT_COLUMNS: bool = false;
/// Default cap on tables returned by `list_tables`.
pub const DEFAULT_MAX_RESULTS: u64 = 10;
/// Default poll budget for `execute_sql`, in seconds.
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 60;
/// Default row cap for `execute_sql`.
pub const DEFAULT_MAX_ROWS: u64 = 100;

/// Type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    /// Returns the JSON Schema type name.
    pub fn schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// Default value advertised for an optional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Str(&'static str),
    Int(u64),
    Bool(bool),
}

impl ParamDefault {
    fn to_json(self) -> Value {
        match self {
            Self::Str(s) => json!(s),
            Self::Int(n) => json!(n),
            Self::Bool(b) => json!(b),
        }
    }
}

/// Definition of a tool parameter.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

/// Which handler serves a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListCatalogs,
    ListSchemas,
    ListTables,
    GetTable,
    ExecuteSql,
    ListWarehouses,
}

/// Definition of a tool.
#[derive(Debug, Clone)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDef],
    pub kind: ToolKind,
}

/// All tool definitions, in advertised order.
pub static TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "list_catalogs",
        description: "Lists all catalogs available in the Databricks workspace",
        params: &[],
        kind: ToolKind::ListCatalogs,
    },
    ToolDef {
        name: "list_schemas",
        description: "Lists all schemas in a specified Databricks catalog",
        params: &[ParamDef {
            name: "catalog",
            description: "Name of the catalog to list schemas from",
            param_type: ParamType::String,
            required: true,
            default: None,
        }],
        kind: ToolKind::ListSchemas,
    },
    ToolDef {
        name: "list_tables",
        description: "Lists tables in a Databricks catalog and schema, optionally \
                      filtered by a regular expression on the table name",
        params: &[
            ParamDef {
                name: "catalog",
                description: "Name of the catalog containing the schema",
                param_type: ParamType::String,
                required: true,
                default: None,
            },
            ParamDef {
                name: "schema",
                description: "Name of the schema to list tables from",
                param_type: ParamType::String,
                required: true,
                default: None,
            },
            ParamDef {
                name: "table_name_pattern",
                description: "Regular expression matched against the table name",
                param_type: ParamType::String,
                required: false,
                default: Some(ParamDefault::Str(DEFAULT_TABLE_NAME_PATTERN)),
            },
            ParamDef {
                name: "omit_properties",
                description: "Leave table properties out of the response",
                param_type: ParamType::Boolean,
                required: false,
                default: Some(ParamDefault::Bool(DEFAULT_OMIT_PROPERTIES)),
            },
            ParamDef {
                name: "omit_columns",
                description: "Leave column details out of the response",
                param_type: ParamType::Boolean,
                required: false,
                default: Some(ParamDefault::Bool(DEFAULT_OMIT_COLUMNS)),
            },
            ParamDef {
                name: "max_results",
                description: "Maximum number of tables to return (0 for all)",
                param_type: ParamType::Integer,
                required: false,
                default: Some(ParamDefault::Int(DEFAULT_MAX_RESULTS)),
            },
        ],
        kind: ToolKind::ListTables,
    },
    ToolDef {
        name: "get_table",
        description: "Gets detailed information about a single Databricks table",
        params: &[ParamDef {
            name: "full_name",
            description: "Full name of the table in format 'catalog.schema.table'",
            param_type: ParamType::String,
            required: true,
            default: None,
        }],
        kind: ToolKind::GetTable,
    },
    ToolDef {
        name: "execute_sql",
        description: "Executes a SQL statement on a Databricks SQL warehouse and \
                      returns the results",
        params: &[
            ParamDef {
                name: "statement",
                description: "SQL statement to execute",
                param_type: ParamType::String,
                required: true,
                default: None,
            },
            ParamDef {
                name: "execution_timeout_seconds",
                description: "Maximum time to wait for the statement to complete",
                param_type: ParamType::Integer,
                required: false,
                default: Some(ParamDefault::Int(DEFAULT_EXECUTION_TIMEOUT_SECS)),
            },
            ParamDef {
                name: "max_rows",
                description: "Maximum number of rows to return (0 for no limit)",
                param_type: ParamType::Integer,
                required: false,
                default: Some(ParamDefault::Int(DEFAULT_MAX_ROWS)),
            },
            ParamDef {
                name: "warehouse_id",
                description: "SQL warehouse to run on; empty selects the first available",
                param_type: ParamType::String,
                required: false,
                default: Some(ParamDefault::Str("")),
            },
        ],
        kind: ToolKind::ExecuteSql,
    },
    ToolDef {
        name: "list_warehouses",
        description: "Lists all SQL warehouses available in the Databricks workspace",
        params: &[],
        kind: ToolKind::ListWarehouses,
    },
];

/// Looks up a tool by name.
pub fn find_tool(name: &str) -> Option<&'static ToolDef> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// Tool descriptor as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDef {
    /// Renders the JSON Schema for this tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!(param.param_type.schema_type()));
            schema.insert("description".to_string(), json!(param.description));
            if let Some(default) = param.default {
                schema.insert("default".to_string(), default.to_json());
            }
            if param.param_type == ParamType::Integer {
                schema.insert("minimum".to_string(), json!(0));
            }
            properties.insert(param.name.to_string(), Value::Object(schema));
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Returns the descriptors for every tool.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    TOOLS.iter().map(ToolDef::to_definition).collect()
}
