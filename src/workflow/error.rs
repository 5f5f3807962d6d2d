/// Workflow Error Taxonomy
///
/// Every way a single call to the workflow API can fail. Shape failures name
/// the exact path segment that did not match, so a caller can tell an empty
/// `outputs` array apart from a missing `message.text`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request never produced a readable response.
    #[error("failed to send request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The API answered with something other than 200. The body is kept raw.
    #[error("API returned error (status {status}): {body}")]
    RemoteApi { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("invalid response format: missing {0}")]
    MissingField(&'static str),

    #[error("invalid response format: {0} is not an object")]
    ShapeMismatch(&'static str),
}
