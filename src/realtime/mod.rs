//! HTTP transport and server-sent notification stream
//!
//! POST carries JSON-RPC calls; GET with `Accept: text/event-stream` opens a
//! bounded stream of protocol notifications.

mod events;
mod server;
mod stream;

pub use events::{NotificationFrame, NotificationKind};
pub use server::{AppState, ConnectionGuard, ConnectionId, ConnectionTracker, McpHttpServer};
pub use stream::{notification_stream, Phase};
