/// Core Server Framework Module
///
/// This module contains the core server implementation including:
/// - config.rs: command-line and environment configuration
/// - protocol.rs: JSON-RPC and MCP message types
/// - server.rs: tool registry, dispatcher, STDIO and HTTP transports

pub mod config;
pub mod protocol;
pub mod server;
