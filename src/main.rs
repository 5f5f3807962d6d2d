/// Aptos MCP Server Entry Point
///
/// Parses configuration, wires the Aptos tool to the workflow API and the
/// audit log directory, then serves MCP over the selected transport.
///
/// Run with `--help` for flags; each flag also reads an environment variable
/// (MCP_TRANSPORT_MODE, HOST, PORT, WORKFLOW_API_URL, MCP_LOG_DIR, ...).

mod audit;
mod core;
mod tools;
mod workflow;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::audit::FileAuditSink;
use crate::core::config::{Config, Transport};
use crate::core::server::{self, McpServer, ToolRegistry};
use crate::tools::aptos::{self, AptosTool};
use crate::workflow::WorkflowClient;

/// Build the dispatcher with every tool registered.
fn build_server(config: &Config) -> Arc<McpServer> {
    let audit = FileAuditSink::new(config.log_dir.clone());
    if let Err(e) = audit.ensure_dir() {
        warn!(error = %e, "audit logs will not be written until the directory is usable");
    }

    let client = WorkflowClient::new(&config.api_url, &config.agent_id);
    info!(endpoint = %client.endpoint(), log_dir = %audit.dir().display(), "workflow target configured");

    let mut registry = ToolRegistry::new();
    aptos::register(&mut registry, Arc::new(AptosTool::new(client, Arc::new(audit))));

    Arc::new(McpServer::new(
        config.server_name.clone(),
        config.server_version.clone(),
        registry,
    ))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    // Log to stderr (stdout is used for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::parse();
    info!(transport = ?config.transport, "=== {} service starting ===", config.server_name);
    let server = build_server(&config);

    match config.transport {
        Transport::Stdio => server::run_server_stdio(server).await,
        Transport::Sse => {
            server::run_server_http(server, config.host.clone(), config.port, config.worker_threads())
                .await
        }
        Transport::Both => {
            // STDIO in the background, HTTP in the foreground
            let stdio_server = server.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(stdio_server).await {
                    tracing::error!(error = %e, "STDIO server error");
                }
            });

            let http_result =
                server::run_server_http(server, config.host.clone(), config.port, config.worker_threads())
                    .await;

            // If HTTP server exits, abort STDIO task
            stdio_handle.abort();

            http_result
        }
    }
}
