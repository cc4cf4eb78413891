//! Notification frames pushed over the event stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::mcp::protocol::{notifications, JSONRPC_VERSION};
use crate::registry::ToolSchema;

/// Kinds of frames a connection can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ConnectionEstablished,
    Tools,
    Ping,
}

impl NotificationKind {
    pub fn method(self) -> &'static str {
        match self {
            NotificationKind::ConnectionEstablished => notifications::CONNECTION_ESTABLISHED,
            NotificationKind::Tools => notifications::TOOLS,
            NotificationKind::Ping => notifications::PING,
        }
    }

    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            notifications::CONNECTION_ESTABLISHED => Some(NotificationKind::ConnectionEstablished),
            notifications::TOOLS => Some(NotificationKind::Tools),
            notifications::PING => Some(NotificationKind::Ping),
            _ => None,
        }
    }
}

/// A JSON-RPC notification frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFrame {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    /// Only the connection greeting carries an id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl NotificationFrame {
    fn new(kind: NotificationKind, params: Value, id: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: kind.method().to_string(),
            params,
            id,
        }
    }

    /// Greeting sent first on every connection
    pub fn connection_established(connection_id: &str) -> Self {
        Self::new(
            NotificationKind::ConnectionEstablished,
            json!({ "id": connection_id }),
            Some(Uuid::new_v4().to_string()),
        )
    }

    /// Point-in-time snapshot of the tool list
    pub fn tools(tools: Vec<ToolSchema>) -> Self {
        Self::new(NotificationKind::Tools, json!({ "tools": tools }), None)
    }

    pub fn ping() -> Self {
        Self::ping_at(Utc::now())
    }

    /// Heartbeat stamped with `at` as fractional unix seconds
    pub fn ping_at(at: DateTime<Utc>) -> Self {
        let timestamp = at.timestamp_micros() as f64 / 1_000_000.0;
        Self::new(NotificationKind::Ping, json!({ "timestamp": timestamp }), None)
    }

    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::from_method(&self.method)
    }

    pub fn to_json(&self) -> String {
        // frames hold only strings and JSON values
        serde_json::to_string(self).unwrap_or_default()
    }
}
