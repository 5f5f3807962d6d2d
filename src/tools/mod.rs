/// Tools Module
///
/// This module contains all MCP tool implementations. Each tool is implemented
/// as a separate module that exports a `register` function to add the tool to
/// the registry during server initialization.

use thiserror::Error;

use crate::workflow::WorkflowError;

pub mod aptos;

/// Failure of a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad or missing caller-supplied argument. No remote call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}
