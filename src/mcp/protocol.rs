//! MCP JSON-RPC protocol types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpServerError;

/// JSON-RPC protocol tag
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version reported by `initialize`
pub const PROTOCOL_VERSION: &str = "0.7.0";

/// Schema version reported by `initialize`
pub const SCHEMA_VERSION: &str = "mcp-0.7.0";

/// MCP JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// MCP JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    /// Echoed from the request; serialized as `null` when the request had none
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create error from McpServerError
    pub fn from_error(id: Option<Value>, err: &McpServerError) -> Self {
        Self::error(id, err.code(), err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Methods understood by the dispatcher
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const LIST_TOOLS: &str = "list_tools";
    pub const CALL_TOOL: &str = "call_tool";
}

/// Notification methods pushed over the event stream
pub mod notifications {
    pub const CONNECTION_ESTABLISHED: &str = "connection.established";
    pub const TOOLS: &str = "notification.tools";
    pub const PING: &str = "notification.ping";
}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Implementation-defined server error, used for any failure inside a known method
    pub const SERVER_ERROR: i64 = -32000;
}

/// MCP initialize result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    pub name: String,
    pub description: String,
    pub schema_version: String,
    pub protocol_version: String,
    pub server_source: String,
}

impl InitializeResult {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        server_source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema_version: SCHEMA_VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_source: server_source.into(),
        }
    }
}
