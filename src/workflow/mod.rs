/// Workflow API Integration
///
/// This module holds everything needed to forward a message to the remote
/// workflow-execution API:
/// - payload.rs: request body construction
/// - client.rs: the HTTP POST to the run endpoint
/// - extract.rs: strict walk of the response document down to the reply text
/// - error.rs: failure taxonomy shared by the three stages

pub mod client;
pub mod error;
pub mod extract;
pub mod payload;

#[cfg(test)]
pub mod stub;

pub use client::WorkflowClient;
pub use error::WorkflowError;
pub use extract::extract_text;
pub use payload::RunRequest;
