/// Server Configuration
///
/// Command-line flags with environment variable fallbacks. A `.env` file in
/// the working directory is loaded before parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::workflow::client::{DEFAULT_AGENT_ID, DEFAULT_API_URL};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// HTTP server with the SSE transport and a direct JSON-RPC endpoint
    #[value(alias = "http")]
    Sse,
    /// STDIO and HTTP at the same time
    Both,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "aptos-mcp",
    version,
    about = "Aptos MCP server - forwards tool calls to the Aptos workflow API"
)]
pub struct Config {
    /// Transport type
    #[arg(short, long, env = "MCP_TRANSPORT_MODE", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// Bind address for the HTTP transport
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value_t = 8282)]
    pub port: u16,

    /// HTTP worker threads (defaults to CPU count, max 16)
    #[arg(long, env = "WORKER_THREADS")]
    pub workers: Option<usize>,

    /// Name reported in initialize responses
    #[arg(long, env = "SERVER_NAME", default_value = "Aptos-MCP")]
    pub server_name: String,

    /// Version reported in initialize responses
    #[arg(long, env = "SERVER_VERSION", default_value = "0.1.0")]
    pub server_version: String,

    /// Base URL of the workflow API
    #[arg(long, env = "WORKFLOW_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Flow to run on the workflow API
    #[arg(long, env = "WORKFLOW_AGENT_ID", default_value = DEFAULT_AGENT_ID)]
    pub agent_id: String,

    /// Directory for per-invocation audit logs
    #[arg(long, env = "MCP_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl Config {
    /// Worker count for the HTTP server.
    pub fn worker_threads(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .unwrap_or_else(|| num_cpus::get().clamp(1, 16))
    }
}
