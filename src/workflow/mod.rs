//! Workflow invocation service
//!
//! The workflow engine is an external service. This module defines the
//! contract the server needs from it, an HTTP implementation of that
//! contract, and the `run_workflow` tool that exposes it over MCP.

mod client;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use client::HttpWorkflowClient;

use crate::error::{McpServerError, Result};
use crate::registry::{Annotation, LazyRegistry, ParamDecl, ToolFn, ToolRegistry};

/// Name the workflow tool is registered under
pub const RUN_WORKFLOW_TOOL: &str = "run_workflow";

/// How the workflow service should deliver its response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Blocking,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Blocking => write!(f, "blocking"),
        }
    }
}

/// Contract of the workflow engine
#[async_trait]
pub trait WorkflowInvoker: Send + Sync {
    /// Run the workflow of `app_id` with `inputs`, returning the raw response document
    async fn invoke(
        &self,
        app_id: &str,
        inputs: Map<String, Value>,
        mode: ResponseMode,
    ) -> Result<Value>;
}

/// Flatten legacy `{"responseValues": {key: {"value": v}}}` into `{key: v}`
///
/// A missing `responseValues` yields no inputs. Entries must be objects; an
/// entry without a `value` key maps to `null`.
pub fn flatten_response_values(body: &Map<String, Value>) -> Result<Map<String, Value>> {
    let Some(values) = body.get("responseValues") else {
        return Ok(Map::new());
    };
    let values = values.as_object().ok_or_else(|| {
        McpServerError::Transport("responseValues must be an object".to_string())
    })?;

    values
        .iter()
        .map(|(key, entry)| {
            let entry = entry.as_object().ok_or_else(|| {
                McpServerError::Transport(format!("responseValues.{} must be an object", key))
            })?;
            Ok((key.clone(), entry.get("value").cloned().unwrap_or(Value::Null)))
        })
        .collect()
}

/// Textual result of a workflow run: `data.outputs.output`
pub fn extract_output(response: &Value) -> Result<String> {
    match response.pointer("/data/outputs/output") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => {
            let reason = response
                .pointer("/data/error")
                .and_then(Value::as_str)
                .unwrap_or("response has no data.outputs.output");
            Err(McpServerError::Workflow(reason.to_string()))
        }
        Some(other) => Ok(other.to_string()),
    }
}

/// Tool that forwards a query to the configured workflow app
pub fn run_workflow_tool(invoker: Arc<dyn WorkflowInvoker>) -> ToolFn {
    ToolFn::asynchronous(RUN_WORKFLOW_TOOL, move |ctx, args| {
        let invoker = Arc::clone(&invoker);
        async move {
            let app_id = ctx.require_app_id()?.to_string();
            let response = invoker.invoke(&app_id, args, ResponseMode::Blocking).await?;
            Ok::<_, anyhow::Error>(Value::String(extract_output(&response)?))
        }
    })
    .doc(
        "Run the configured workflow application and return its text output.\n\
         \n\
         query: Input text passed to the workflow",
    )
    .with_param(ParamDecl::new("query", Annotation::Str))
}

/// Register every workflow-backed tool
pub fn register_workflow_tools(registry: &mut ToolRegistry, invoker: Arc<dyn WorkflowInvoker>) {
    registry.register(run_workflow_tool(invoker), None, None);
}

/// Process-wide registry holding the workflow tools, built on first use
pub fn workflow_registry(invoker: Arc<dyn WorkflowInvoker>) -> LazyRegistry {
    LazyRegistry::new(move || {
        let mut registry = ToolRegistry::new();
        register_workflow_tools(&mut registry, Arc::clone(&invoker));
        registry
    })
}
