//! Command-line argument parsing for databricks-mcp.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Databricks catalog browsing and SQL execution over MCP (stdio).
#[derive(Parser, Debug)]
#[command(name = "databricks-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Workspace URL (overrides config file and DATABRICKS_HOST)
    #[arg(short = 'H', long, value_name = "URL")]
    pub host: Option<String>,

    /// Seconds between statement status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Write logs to the state directory instead of stderr
    #[arg(long)]
    pub log_file: bool,

    /// Serve from an in-memory demo workspace instead of Databricks
    #[arg(long)]
    pub mock: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Overrides file settings with the flags that were given.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.workspace.host = Some(host.clone());
        }
        if let Some(poll_interval) = self.poll_interval {
            config.execution.poll_interval_secs = poll_interval;
        }
    }
}
