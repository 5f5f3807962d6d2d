/// Aptos Tool Implementation
///
/// Forwards the caller's message to the Aptos workflow, returns the reply
/// text, and leaves an audit record of the exchange.

use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::audit::{AuditRecord, AuditSink};
use crate::core::protocol::{MCPTool, ToolResult};
use crate::core::server::{ToolHandler, ToolRegistry};
use crate::tools::ToolError;
use crate::workflow::{RunRequest, WorkflowClient, extract_text};

pub const TOOL_NAME: &str = "Aptos-TOOL";

pub struct AptosTool {
    client: WorkflowClient,
    audit: Arc<dyn AuditSink>,
}

impl AptosTool {
    pub fn new(client: WorkflowClient, audit: Arc<dyn AuditSink>) -> Self {
        Self { client, audit }
    }

    pub fn definition() -> MCPTool {
        MCPTool {
            name: TOOL_NAME.to_string(),
            description: "Retrieval-Augmented Generation tool for contextual responses".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Input message to process"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    /// Run one invocation: validate, forward, extract, then audit.
    ///
    /// Any failure before extraction completes is returned as is and nothing
    /// is audited. A failing audit sink only produces a warning.
    pub async fn call(&self, args: &Map<String, Value>) -> Result<ToolResult, ToolError> {
        info!(tool = TOOL_NAME, arguments = ?args, "tool called");

        // Extract and validate the required "message" parameter before any
        // network traffic
        let message = args.get("message").and_then(Value::as_str).ok_or_else(|| {
            ToolError::InvalidArgument("message parameter is required and must be a string".into())
        })?;

        // Forward to the workflow API; non-200 and transport failures end here
        let request = RunRequest::chat(message);
        let response = self.client.run(&request).await?;
        // Walk outputs[0].outputs[0].results.message.text
        let text = extract_text(&response.body)
            .inspect_err(|e| warn!(error = %e, "unexpected workflow response"))?;
        info!(tool = TOOL_NAME, bytes = text.len(), "processing completed");

        // Best-effort audit of the exchange; a failed write only warns
        let record = AuditRecord::new(
            TOOL_NAME,
            json!({
                "message": message,
                "url": self.client.endpoint(),
                "payload": request.to_value(),
            }),
            json!({
                "status": response.status,
                "content": text,
            }),
        );
        match self.audit.record(&record) {
            Ok(path) => info!(path = %path.display(), "log saved"),
            Err(e) => warn!(error = %e, "failed to log request"),
        }

        Ok(ToolResult::text(text))
    }
}

/// Register the Aptos tool with the tool registry.
pub fn register(registry: &mut ToolRegistry, tool: Arc<AptosTool>) {
    // Each call gets its own handle on the shared tool so the future is 'static
    let handler: ToolHandler = Box::new(move |args: Map<String, Value>| {
        let tool = Arc::clone(&tool);
        async move { tool.call(&args).await }.boxed()
    });

    registry.register(AptosTool::definition(), handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::FileAuditSink;
    use crate::audit::testing::{FailingSink, MemorySink};
    use crate::workflow::WorkflowError;
    use crate::workflow::stub::WorkflowStub;

    const PONG: &str = r#"{"outputs":[{"outputs":[{"results":{"message":{"text":"pong"}}}]}]}"#;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn tool_for(stub: &WorkflowStub, audit: Arc<dyn AuditSink>) -> AptosTool {
        AptosTool::new(WorkflowClient::new(&stub.base_url, "agent-1"), audit)
    }

    #[actix_rt::test]
    async fn ping_returns_pong_and_audits_exchange() {
        let stub = WorkflowStub::start(200, PONG);
        let sink = Arc::new(MemorySink::default());
        let tool = tool_for(&stub, sink.clone());

        let result = tool.call(&args(json!({"message": "ping"}))).await.unwrap();
        assert_eq!(result, ToolResult::text("pong"));

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.operation, TOOL_NAME);
        assert_eq!(record.request["message"], "ping");
        assert_eq!(record.request["payload"]["input_value"], "ping");
        assert!(record.request["url"].as_str().unwrap().ends_with("/api/v1/run/agent-1?stream=false"));
        assert_eq!(record.response, json!({"status": 200, "content": "pong"}));
        drop(records);

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn remote_error_is_returned_and_not_audited() {
        let stub = WorkflowStub::start(500, "internal error");
        let sink = Arc::new(MemorySink::default());
        let tool = tool_for(&stub, sink.clone());

        let err = tool.call(&args(json!({"message": "ping"}))).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Workflow(WorkflowError::RemoteApi { status: 500, ref body }) if body == "internal error"
        ));
        assert!(sink.records.lock().unwrap().is_empty());

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn unexpected_shape_is_returned_and_not_audited() {
        let stub = WorkflowStub::start(200, r#"{"outputs":[]}"#);
        let sink = Arc::new(MemorySink::default());
        let tool = tool_for(&stub, sink.clone());

        let err = tool.call(&args(json!({"message": "ping"}))).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Workflow(WorkflowError::MissingField("outputs"))
        ));
        assert!(sink.records.lock().unwrap().is_empty());

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn invalid_message_never_reaches_the_api() {
        let stub = WorkflowStub::start(200, PONG);
        let tool = tool_for(&stub, Arc::new(MemorySink::default()));

        for bad in [json!({}), json!({"message": 42}), json!({"message": null}), json!({"msg": "ping"})] {
            let err = tool.call(&args(bad)).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgument(_)));
        }
        assert_eq!(stub.hits(), 0);

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn audit_failure_does_not_change_result() {
        let stub = WorkflowStub::start(200, PONG);
        let tool = tool_for(&stub, Arc::new(FailingSink));

        let result = tool.call(&args(json!({"message": "ping"}))).await.unwrap();
        assert_eq!(result, ToolResult::text("pong"));

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn writes_log_file_under_directory() {
        let stub = WorkflowStub::start(200, PONG);
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let tool = tool_for(&stub, Arc::new(FileAuditSink::new(&dir)));

        tool.call(&args(json!({"message": "ping"}))).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().map(|e| e.unwrap().path()).collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(name.len(), "YYYYMMDD-HHMMSS.log".len());
        assert!(name.ends_with(".log"));

        let contents = std::fs::read_to_string(&entries[0]).unwrap();
        assert!(contents.starts_with("=== Aptos-TOOL OPERATION ["));
        assert!(contents.contains("REQUEST:\n"));
        assert!(contents.contains("RESPONSE:\n"));
        assert!(contents.contains("\"content\": \"pong\""));

        stub.stop().await;
    }

    #[actix_rt::test]
    async fn registered_handler_dispatches_to_tool() {
        let stub = WorkflowStub::start(200, PONG);
        let mut registry = ToolRegistry::new();
        register(
            &mut registry,
            Arc::new(tool_for(&stub, Arc::new(MemorySink::default()))),
        );

        assert_eq!(registry.tools.len(), 1);
        assert_eq!(registry.tools[0].name, TOOL_NAME);
        assert_eq!(registry.tools[0].input_schema["required"], json!(["message"]));

        let handler = registry.handlers.get(TOOL_NAME).unwrap();
        let result = handler(args(json!({"message": "ping"}))).await.unwrap();
        assert_eq!(result, ToolResult::text("pong"));

        stub.stop().await;
    }
}
