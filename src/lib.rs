//! Workflow MCP - workflow applications as MCP tools
//!
//! Serves a tool registry over a JSON-RPC protocol modeled on the Model
//! Context Protocol: POST for calls, GET for a bounded notification stream.
//! Tools delegate to an external workflow invocation service.

pub mod error;
pub mod mcp;
pub mod realtime;
pub mod registry;
pub mod types;
pub mod workflow;

pub use error::{McpServerError, Result};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
