/// Workflow API Client
///
/// Issues the single POST that runs the remote flow. There is no timeout and
/// no retry at this layer: one call, one outcome.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::error::WorkflowError;
use super::payload::RunRequest;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:7860";

/// Flow identifier of the "advanced" Aptos agent.
pub const DEFAULT_AGENT_ID: &str = "9a248a2d-89b7-402e-9e23-2112a3083c7f";

/// Successful (HTTP 200) run response, body still unparsed.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    endpoint: String,
}

impl WorkflowClient {
    pub fn new(api_url: &str, agent_id: &str) -> Self {
        let endpoint = format!(
            "{}/api/v1/run/{}?stream=false",
            api_url.trim_end_matches('/'),
            agent_id
        );
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `request` to the run endpoint.
    ///
    /// Any status other than 200 becomes [`WorkflowError::RemoteApi`] carrying
    /// the body text as received; it is never decoded as JSON.
    pub async fn run(&self, request: &RunRequest) -> Result<RunResponse, WorkflowError> {
        info!(url = %self.endpoint, "sending request to workflow API");
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(request.to_json())
            .send()
            .await
            .map_err(WorkflowError::Transport)?;

        let status = response.status();
        info!(status = status.as_u16(), "received workflow API response");

        let body = response.bytes().await.map_err(WorkflowError::Transport)?;
        debug!(bytes = body.len(), "read workflow API response body");

        if status != StatusCode::OK {
            return Err(WorkflowError::RemoteApi {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(RunResponse {
            status: status.as_u16(),
            body,
        })
    }
}
