//! HTTP client for the workflow invocation service

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{ResponseMode, WorkflowInvoker};
use crate::error::{McpServerError, Result};

/// Workflow service reached over HTTP
///
/// Runs are posted to `{base_url}/workflows/run` with the API key as a
/// bearer token.
pub struct HttpWorkflowClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    user: String,
}

impl HttpWorkflowClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, user: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            user: user.into(),
        }
    }

    /// Build a client with a request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            ..Self::new(base_url, api_key, user)
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WorkflowInvoker for HttpWorkflowClient {
    async fn invoke(
        &self,
        app_id: &str,
        inputs: Map<String, Value>,
        mode: ResponseMode,
    ) -> Result<Value> {
        let url = format!("{}/workflows/run", self.base_url);
        tracing::debug!(%app_id, %mode, "invoking workflow");

        let mut request = self.client.post(&url).json(&json!({
            "app_id": app_id,
            "inputs": inputs,
            "response_mode": mode,
            "user": self.user,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpServerError::Workflow(format!(
                "Workflow API error {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        Ok(body)
    }
}
