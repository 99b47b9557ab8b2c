//! Table name filtering for `list_tables`.

use regex::Regex;

use crate::client::TableInfo;
use crate::error::{McpError, Result};

/// A compiled table name pattern.
///
/// The pattern is matched unanchored against the bare table name, not the
/// three-level name.
#[derive(Debug, Clone)]
pub struct TableFilter {
    regex: Option<Regex>,
}

impl TableFilter {
    /// Compiles `pattern`. `""` and `".*"` match everything and skip the
    /// regex engine altogether.
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() || pattern == ".*" {
            return Ok(Self { regex: None });
        }

        let regex = Regex::new(pattern).map_err(|source| McpError::Filter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    pub fn is_identity(&self) -> bool {
        self.regex.is_none()
    }

    pub fn matches(&self, table: &TableInfo) -> bool {
        self.regex
            .as_ref()
            .map_or(true, |regex| regex.is_match(&table.name))
    }

    /// Keeps the matching tables, preserving order.
    pub fn apply(&self, tables: Vec<TableInfo>) -> Vec<TableInfo> {
        if self.is_identity() {
            return tables;
        }
        tables.into_iter().filter(|t| self.matches(t)).collect()
    }
}
