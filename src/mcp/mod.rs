//! MCP (Model Context Protocol) server core
//!
//! JSON-RPC envelopes, the method table, and the legacy workflow call.

pub mod dispatch;
pub mod protocol;

pub use dispatch::{Dispatcher, PostOutcome};
pub use protocol::{
    error_codes, methods, notifications, InitializeResult, McpError, McpRequest, McpResponse,
};
