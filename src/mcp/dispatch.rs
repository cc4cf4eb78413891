//! JSON-RPC dispatcher and legacy direct-call path

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use super::protocol::{methods, McpRequest, McpResponse};
use crate::error::{McpServerError, Result};
use crate::registry::{Arguments, LazyRegistry};
use crate::types::{CallContext, ServerSettings};
use crate::workflow::{flatten_response_values, ResponseMode, WorkflowInvoker};

/// Result of handling one POST body: an HTTP status and a JSON document
#[derive(Debug, Clone, PartialEq)]
pub struct PostOutcome {
    pub status: StatusCode,
    pub body: Value,
}

impl PostOutcome {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    fn failure(status: StatusCode, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }
}

/// Routes inbound POST bodies to the method table or the legacy workflow call
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<LazyRegistry>,
    settings: Arc<ServerSettings>,
    invoker: Arc<dyn WorkflowInvoker>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<LazyRegistry>,
        settings: Arc<ServerSettings>,
        invoker: Arc<dyn WorkflowInvoker>,
    ) -> Self {
        Self {
            registry,
            settings,
            invoker,
        }
    }

    pub fn registry(&self) -> &Arc<LazyRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &Arc<ServerSettings> {
        &self.settings
    }

    /// Handle a raw POST body
    ///
    /// Unparseable bodies and non-object documents are rejected with 400.
    /// JSON-RPC envelopes always come back with 200, whatever the outcome.
    pub async fn handle_post(&self, body: &[u8], ctx: &CallContext) -> PostOutcome {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("rejecting unparseable body: {}", e);
                return PostOutcome::failure(
                    StatusCode::BAD_REQUEST,
                    McpServerError::Transport(format!("invalid JSON body: {}", e)),
                );
            }
        };

        let Value::Object(document) = value else {
            return PostOutcome::failure(
                StatusCode::BAD_REQUEST,
                McpServerError::Transport("request body must be a JSON object".into()),
            );
        };

        if document.contains_key("jsonrpc") {
            let response = self.handle_envelope(document, ctx).await;
            // McpResponse holds only JSON values and strings
            let body = serde_json::to_value(&response).unwrap_or(Value::Null);
            return PostOutcome::ok(body);
        }

        self.handle_legacy(&document, ctx).await
    }

    /// Decode a JSON-RPC envelope and dispatch it
    pub async fn handle_envelope(&self, document: Map<String, Value>, ctx: &CallContext) -> McpResponse {
        let id = document.get("id").cloned();
        match serde_json::from_value::<McpRequest>(Value::Object(document)) {
            Ok(request) => self.handle_request(request, ctx).await,
            Err(e) => McpResponse::from_error(
                id,
                &McpServerError::InvalidRequest(format!("malformed envelope: {}", e)),
            ),
        }
    }

    /// Dispatch one request through the method table
    pub async fn handle_request(&self, request: McpRequest, ctx: &CallContext) -> McpResponse {
        let McpRequest {
            id, method, params, ..
        } = request;
        tracing::debug!(%method, "dispatching request");

        let result = match method.as_str() {
            methods::INITIALIZE => self.initialize(),
            methods::LIST_TOOLS => self.list_tools(ctx),
            methods::CALL_TOOL => self.call_tool(params, ctx).await,
            _ => Err(McpServerError::MethodNotFound(method.clone())),
        };

        match result {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => {
                if e.is_client_error() {
                    tracing::debug!(%method, "request rejected: {}", e);
                } else {
                    tracing::warn!(%method, "request failed: {}", e);
                }
                McpResponse::from_error(id, &e)
            }
        }
    }

    fn initialize(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.settings.initialize_result())?)
    }

    fn list_tools(&self, ctx: &CallContext) -> Result<Value> {
        ctx.require_app_id()?;
        let tools = self.registry.get().list();
        Ok(json!({ "tools": tools }))
    }

    async fn call_tool(&self, params: Value, ctx: &CallContext) -> Result<Value> {
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(McpServerError::Validation("params must be an object".into())),
        };

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| McpServerError::Validation("Tool name is required".into()))?;

        let arguments: Arguments = match params.get("arguments") {
            None | Some(Value::Null) => Arguments::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(McpServerError::Validation("arguments must be an object".into()))
            }
        };

        let output = self
            .registry
            .get()
            .execute_by_name(name, arguments, ctx, self.settings.tool_timeout())
            .await?;
        Ok(output.into_value())
    }

    /// `{responseValues: {key: {value}}}` forwarded straight to the workflow service
    async fn handle_legacy(&self, document: &Map<String, Value>, ctx: &CallContext) -> PostOutcome {
        let inputs = match flatten_response_values(document) {
            Ok(inputs) => inputs,
            Err(e) => return PostOutcome::failure(StatusCode::BAD_REQUEST, e),
        };

        let app_id = match ctx.require_app_id() {
            Ok(app_id) => app_id,
            Err(e) => return PostOutcome::failure(StatusCode::INTERNAL_SERVER_ERROR, e),
        };

        match self
            .invoker
            .invoke(app_id, inputs, ResponseMode::Blocking)
            .await
        {
            Ok(workflow_response) => PostOutcome::ok(json!({
                "status": "success",
                "workflow_response": workflow_response,
            })),
            Err(e) => {
                tracing::error!(%app_id, "workflow invocation failed: {}", e);
                PostOutcome::failure(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::error_codes;
    use crate::registry::{Annotation, ToolFn, ToolRegistry};
    use crate::workflow::testing::RecordingInvoker;
    use pretty_assertions::assert_eq;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolFn::blocking("echo", |_ctx, args| Ok(args["text"].clone()))
                .doc("Echo text back.\ntext: what to echo")
                .param("text", Annotation::Str),
            None,
            None,
        );
        registry
    }

    fn dispatcher(invoker: Arc<RecordingInvoker>) -> Dispatcher {
        Dispatcher::new(
            Arc::new(LazyRegistry::new(registry)),
            Arc::new(ServerSettings::default()),
            invoker,
        )
    }

    fn with_app() -> CallContext {
        CallContext::new(Some("app-1".into()))
    }

    async fn post(dispatcher: &Dispatcher, body: Value, ctx: &CallContext) -> PostOutcome {
        dispatcher
            .handle_post(body.to_string().as_bytes(), ctx)
            .await
    }

    #[tokio::test]
    async fn test_initialize() {
        let d = dispatcher(Arc::default());
        let out = post(
            &d,
            json!({"jsonrpc": "2.0", "method": "initialize", "id": 1}),
            &CallContext::default(),
        )
        .await;
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body["id"], 1);
        assert_eq!(out.body["result"]["protocol_version"], "0.7.0");
        assert_eq!(out.body["result"]["schema_version"], "mcp-0.7.0");
    }

    #[tokio::test]
    async fn test_list_tools_requires_app_id() {
        let d = dispatcher(Arc::default());
        let body = json!({"jsonrpc": "2.0", "method": "list_tools", "id": "1"});

        let out = post(&d, body.clone(), &CallContext::default()).await;
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body["id"], "1");
        assert_eq!(out.body["error"]["code"], error_codes::SERVER_ERROR);
        assert!(!d.registry().is_populated());

        let out = post(&d, body, &with_app()).await;
        assert_eq!(out.body["result"]["tools"][0]["name"], "echo");
        assert!(out.body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_call_tool() {
        let d = dispatcher(Arc::default());
        let out = post(
            &d,
            json!({
                "jsonrpc": "2.0",
                "method": "call_tool",
                "params": {"name": "echo", "arguments": {"text": "hi"}},
                "id": 5
            }),
            &CallContext::default(),
        )
        .await;
        assert_eq!(out.body["result"], json!({"output": "hi"}));
    }

    #[tokio::test]
    async fn test_call_tool_unknown_and_missing_name() {
        let d = dispatcher(Arc::default());
        let out = post(
            &d,
            json!({"jsonrpc": "2.0", "method": "call_tool", "params": {"name": "unknown"}, "id": "2"}),
            &with_app(),
        )
        .await;
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body["error"]["code"], -32000);
        assert!(out.body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unknown"));

        let out = post(
            &d,
            json!({"jsonrpc": "2.0", "method": "call_tool", "id": "3"}),
            &with_app(),
        )
        .await;
        assert_eq!(out.body["error"]["code"], -32000);
    }

    #[tokio::test]
    async fn test_call_tool_rejects_non_object_arguments() {
        let d = dispatcher(Arc::default());
        let out = post(
            &d,
            json!({"jsonrpc": "2.0", "method": "call_tool", "params": {"name": "echo", "arguments": [1]}, "id": 4}),
            &with_app(),
        )
        .await;
        assert_eq!(out.body["error"]["code"], -32000);
    }

    #[tokio::test]
    async fn test_unknown_method_and_invalid_envelope() {
        let d = dispatcher(Arc::default());
        let out = post(
            &d,
            json!({"jsonrpc": "2.0", "method": "tools/list", "id": 9}),
            &with_app(),
        )
        .await;
        assert_eq!(out.body["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let out = post(&d, json!({"jsonrpc": "2.0", "id": 10}), &with_app()).await;
        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body["id"], 10);
        assert_eq!(out.body["error"]["code"], error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unparseable_and_non_object_bodies() {
        let d = dispatcher(Arc::default());
        let out = d.handle_post(b"{not json", &with_app()).await;
        assert_eq!(out.status, StatusCode::BAD_REQUEST);
        assert!(out.body["error"].is_string());

        let out = post(&d, json!([1, 2]), &with_app()).await;
        assert_eq!(out.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_legacy_call_flattens_values() {
        let invoker = Arc::new(RecordingInvoker::default());
        let d = dispatcher(invoker.clone());
        let out = post(
            &d,
            json!({"responseValues": {"query": {"value": "weather"}, "n": {"value": 2}}}),
            &with_app(),
        )
        .await;

        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.body["status"], "success");
        assert_eq!(out.body["workflow_response"]["data"]["status"], "succeeded");

        let calls = invoker.calls.lock();
        assert_eq!(calls[0].0, "app-1");
        assert_eq!(Value::Object(calls[0].1.clone()), json!({"query": "weather", "n": 2}));
    }

    #[tokio::test]
    async fn test_legacy_call_failures() {
        let invoker = Arc::new(RecordingInvoker {
            fail_with: Some("quota exceeded".into()),
            ..Default::default()
        });
        let d = dispatcher(invoker);

        let out = post(&d, json!({"responseValues": {}}), &with_app()).await;
        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(out.body["error"].as_str().unwrap().contains("quota exceeded"));

        let out = post(&d, json!({"responseValues": {}}), &CallContext::default()).await;
        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);

        let out = post(&d, json!({"responseValues": {"q": 1}}), &with_app()).await;
        assert_eq!(out.status, StatusCode::BAD_REQUEST);
    }
}
