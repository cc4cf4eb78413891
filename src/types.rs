//! Core types for workflow-mcp

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::McpServerError;
use crate::mcp::protocol::InitializeResult;

pub const DEFAULT_SERVER_NAME: &str = "Workflow MCP Server";
pub const DEFAULT_SERVER_DESCRIPTION: &str = "Exposes a workflow application as MCP tools";
pub const DEFAULT_SERVER_SOURCE: &str = "workflow-mcp";

/// Request-scoped data threaded through a single call
///
/// Built fresh for every inbound request and passed down explicitly
/// (dispatcher -> registry -> tool). Never cached on shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Application id the workflow tools should run against
    pub app_id: Option<String>,
}

impl CallContext {
    pub fn new(app_id: Option<String>) -> Self {
        Self { app_id }
    }

    /// App id, or a validation error naming what is missing
    pub fn require_app_id(&self) -> crate::Result<&str> {
        self.app_id
            .as_deref()
            .ok_or_else(|| crate::McpServerError::Validation("app_id is not configured".into()))
    }
}

/// Heartbeat settings for the notification stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub heartbeat_count: usize,
    pub heartbeat_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_count: default_heartbeat_count(),
            heartbeat_interval: Duration::from_millis(default_heartbeat_interval_ms()),
        }
    }
}

/// Settings consumed by the endpoint adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Workflow application exposed by this server.
    /// Accepts either `"app-123"` or the selector form `{"app_id": "app-123"}`.
    #[serde(default, deserialize_with = "deserialize_app_id")]
    pub app_id: Option<String>,
    pub server_name: Option<String>,
    pub server_description: Option<String>,
    pub server_source: Option<String>,
    /// Bearer token required on inbound requests (None = open)
    pub api_key: Option<String>,
    /// Base URL of the workflow invocation service
    #[serde(default = "default_workflow_base_url")]
    pub workflow_base_url: String,
    /// Bearer token for the workflow invocation service
    pub workflow_api_key: Option<String>,
    /// End-user identifier reported to the workflow service
    #[serde(default = "default_workflow_user")]
    pub workflow_user: String,
    /// Upper bound on a single tool execution
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_heartbeat_count")]
    pub heartbeat_count: usize,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_workflow_base_url() -> String {
    "http://localhost/v1".to_string()
}

fn default_workflow_user() -> String {
    "workflow-mcp".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_heartbeat_count() -> usize {
    20
}

fn default_heartbeat_interval_ms() -> u64 {
    15_000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            server_name: None,
            server_description: None,
            server_source: None,
            api_key: None,
            workflow_base_url: default_workflow_base_url(),
            workflow_api_key: None,
            workflow_user: default_workflow_user(),
            tool_timeout_secs: default_tool_timeout_secs(),
            heartbeat_count: default_heartbeat_count(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl ServerSettings {
    /// Configured app id, treating blank values as absent
    pub fn resolved_app_id(&self) -> Option<String> {
        self.app_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
    }

    /// Fresh context for one inbound request
    pub fn call_context(&self) -> CallContext {
        CallContext::new(self.resolved_app_id())
    }

    pub fn initialize_result(&self) -> InitializeResult {
        InitializeResult::new(
            self.server_name.as_deref().unwrap_or(DEFAULT_SERVER_NAME),
            self.server_description
                .as_deref()
                .unwrap_or(DEFAULT_SERVER_DESCRIPTION),
            self.server_source.as_deref().unwrap_or(DEFAULT_SERVER_SOURCE),
        )
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            heartbeat_count: self.heartbeat_count,
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let url = self.workflow_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(McpServerError::Config(format!(
                "workflow base URL must be http(s): {:?}",
                self.workflow_base_url
            )));
        }
        if self.tool_timeout_secs == 0 {
            return Err(McpServerError::Config(
                "tool timeout must be at least one second".into(),
            ));
        }
        if self.heartbeat_count > 0 && self.heartbeat_interval_ms == 0 {
            return Err(McpServerError::Config(
                "heartbeat interval must be positive when heartbeats are enabled".into(),
            ));
        }
        Ok(())
    }
}

fn deserialize_app_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AppIdSetting {
        Plain(String),
        Selector { app_id: Option<String> },
    }

    Ok(
        match Option::<AppIdSetting>::deserialize(deserializer)? {
            Some(AppIdSetting::Plain(id)) => Some(id),
            Some(AppIdSetting::Selector { app_id }) => app_id,
            None => None,
        },
    )
}
