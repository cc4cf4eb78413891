//! Bounded notification stream for one connection
//!
//! Frames follow a fixed sequence: greeting, tool snapshot, then a fixed
//! number of heartbeats spaced by the configured interval. The stream ends
//! after the last heartbeat. Dropping it (client disconnect) cancels any
//! pending sleep and releases the connection.

use std::sync::Arc;

use futures::stream::{self, Stream};

use super::events::NotificationFrame;
use super::server::ConnectionGuard;
use crate::registry::LazyRegistry;
use crate::types::StreamConfig;

/// Position of a connection in its frame sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Hello,
    ToolsSnapshot,
    /// Index of the next heartbeat to send
    Heartbeat(usize),
    Closed,
}

impl Phase {
    fn after(self, config: &StreamConfig) -> Phase {
        let heartbeat_or_close = |k: usize| {
            if k < config.heartbeat_count {
                Phase::Heartbeat(k)
            } else {
                Phase::Closed
            }
        };
        match self {
            Phase::Hello => Phase::ToolsSnapshot,
            Phase::ToolsSnapshot => heartbeat_or_close(0),
            Phase::Heartbeat(k) => heartbeat_or_close(k + 1),
            Phase::Closed => Phase::Closed,
        }
    }
}

struct Connection {
    id: String,
    registry: Arc<LazyRegistry>,
    config: StreamConfig,
    phase: Phase,
    _guard: Option<ConnectionGuard>,
}

/// Frames for one connection, in order, ending after the last heartbeat
pub fn notification_stream(
    connection_id: String,
    registry: Arc<LazyRegistry>,
    config: StreamConfig,
    guard: Option<ConnectionGuard>,
) -> impl Stream<Item = NotificationFrame> + Send + 'static {
    let connection = Connection {
        id: connection_id,
        registry,
        config,
        phase: Phase::Hello,
        _guard: guard,
    };

    stream::unfold(connection, |mut conn| async move {
        let frame = match conn.phase {
            Phase::Hello => NotificationFrame::connection_established(&conn.id),
            Phase::ToolsSnapshot => NotificationFrame::tools(conn.registry.get().list()),
            Phase::Heartbeat(k) => {
                tokio::time::sleep(conn.config.heartbeat_interval).await;
                tracing::trace!(connection = %conn.id, heartbeat = k, "sending heartbeat");
                NotificationFrame::ping()
            }
            Phase::Closed => {
                tracing::debug!(connection = %conn.id, "notification stream complete");
                return None;
            }
        };
        conn.phase = conn.phase.after(&conn.config);
        Some((frame, conn))
    })
}
