//! databricks-mcp - Databricks catalog browsing and SQL execution as MCP tools.

use std::sync::Arc;

use databricks_mcp::cli::Cli;
use databricks_mcp::client::{MockWorkspace, RestClient, WorkspaceClient};
use databricks_mcp::config::Config;
use databricks_mcp::error::{McpError, Result};
use databricks_mcp::logging;
use databricks_mcp::server::McpServer;
use databricks_mcp::statement::StatementExecutor;
use databricks_mcp::tools::Dispatcher;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    config.execution.validate()?;

    let client: Arc<dyn WorkspaceClient> = if cli.mock {
        info!("Serving from the in-memory demo workspace");
        Arc::new(MockWorkspace::demo())
    } else {
        config.workspace.validate()?;
        info!("Workspace: {}", config.workspace.display_string());
        let host = config.workspace.host.as_deref().unwrap_or_default();
        let token = config.workspace.token.as_deref().unwrap_or_default();
        let client = RestClient::new(host, token, config.workspace.request_timeout())
            .map_err(|e| McpError::config(format!("Failed to create workspace client: {e}")))?;
        Arc::new(client)
    };

    let executor = StatementExecutor::new(config.execution.to_settings());
    let server = McpServer::new(Dispatcher::new(client, executor));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting MCP server on stdio"
    );
    tokio::select! {
        result = server.run_stdio() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            Ok(())
        }
    }
}

/// Resolves configuration with precedence: CLI flags, then the config file,
/// then environment variables.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    cli.apply_overrides(&mut config);
    config.workspace.apply_env_defaults();

    Ok(config)
}
