//! Configuration management for databricks-mcp.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Workspace credentials and statement execution timing live in separate
//! sections.

use crate::error::{McpError, Result};
use crate::statement::ExecutionSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Workspace connection settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Statement execution timing.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Databricks workspace connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://<workspace>.cloud.databricks.com`.
    pub host: Option<String>,

    /// Personal access token.
    pub token: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Statement execution timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionConfig {
    /// Seconds between status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds the service may hold the submission open. 0 or 5..=50.
    #[serde(default = "default_initial_wait_secs")]
    pub initial_wait_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_initial_wait_secs() -> u64 {
    5
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            initial_wait_secs: default_initial_wait_secs(),
        }
    }
}

impl WorkspaceConfig {
    /// Applies `DATABRICKS_HOST` and `DATABRICKS_TOKEN` where unset.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Like [`apply_env_defaults`](Self::apply_env_defaults) with a custom
    /// variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.host.is_none() {
            self.host = lookup("DATABRICKS_HOST").filter(|v| !v.is_empty());
        }
        if self.token.is_none() {
            self.token = lookup("DATABRICKS_TOKEN").filter(|v| !v.is_empty());
        }
    }

    /// Checks that host and token are present and the host is an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let host = self.host.as_deref().ok_or_else(|| {
            McpError::config(
                "No workspace host configured. Set DATABRICKS_HOST, pass --host, \
                 or add [workspace] host to the config file",
            )
        })?;

        let url = Url::parse(host)
            .map_err(|e| McpError::config(format!("Invalid workspace host '{host}': {e}")))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(McpError::config(format!(
                "Invalid scheme '{}' for workspace host. Expected 'https' or 'http'",
                url.scheme()
            )));
        }

        if self.token.as_deref().map_or(true, str::is_empty) {
            return Err(McpError::config(
                "No access token configured. Set DATABRICKS_TOKEN or add [workspace] token \
                 to the config file",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(McpError::config("workspace.timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns a display-safe string (no token) for logging.
    pub fn display_string(&self) -> String {
        self.host.as_deref().unwrap_or("<no host>").to_string()
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(McpError::config(
                "execution.poll_interval_secs must be greater than 0",
            ));
        }
        if self.initial_wait_secs != 0 && !(5..=50).contains(&self.initial_wait_secs) {
            return Err(McpError::config(format!(
                "execution.initial_wait_secs must be 0 or between 5 and 50, got {}",
                self.initial_wait_secs
            )));
        }
        Ok(())
    }

    pub fn to_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            initial_wait: Duration::from_secs(self.initial_wait_secs),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("databricks-mcp")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| McpError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            McpError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
