//! Error types for workflow-mcp

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for workflow-mcp operations
pub type Result<T> = std::result::Result<T, McpServerError>;

/// Main error type for workflow-mcp
#[derive(Error, Debug)]
pub enum McpServerError {
    /// Request body could not be understood at all (HTTP 400)
    #[error("Bad request: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl McpServerError {
    /// Get error code for the JSON-RPC envelope
    ///
    /// Failures inside a recognized method all share the server error code;
    /// only routing problems get the dedicated JSON-RPC codes.
    pub fn code(&self) -> i64 {
        match self {
            McpServerError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpServerError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            _ => error_codes::SERVER_ERROR,
        }
    }

    /// Whether the error belongs to the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            McpServerError::Transport(_)
                | McpServerError::InvalidRequest(_)
                | McpServerError::MethodNotFound(_)
                | McpServerError::Validation(_)
                | McpServerError::ToolNotFound(_)
        )
    }
}
