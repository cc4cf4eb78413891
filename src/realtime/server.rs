//! HTTP endpoints: JSON-RPC over POST, notification stream over GET

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::json;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use super::stream::notification_stream;
use crate::error::{McpServerError, Result};
use crate::mcp::Dispatcher;
use crate::registry::LazyRegistry;
use crate::types::{ServerSettings, DEFAULT_SERVER_NAME};
use crate::workflow::WorkflowInvoker;

/// Connection ID
pub type ConnectionId = String;

/// Tracks open notification streams
#[derive(Clone, Default)]
pub struct ConnectionTracker {
    connections: Arc<RwLock<HashMap<ConnectionId, DateTime<Utc>>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection; it stays open until the guard is dropped
    pub fn open(&self) -> ConnectionGuard {
        let id = Uuid::new_v4().to_string();
        self.connections.write().insert(id.clone(), Utc::now());
        tracing::info!("Client connected: {}", id);
        ConnectionGuard {
            id,
            tracker: self.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.connections.read().len()
    }
}

/// Keeps a connection registered for as long as it lives
pub struct ConnectionGuard {
    id: ConnectionId,
    tracker: ConnectionTracker,
}

impl ConnectionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let opened = self.tracker.connections.write().remove(&self.id);
        let seconds = opened.map_or(0, |at| (Utc::now() - at).num_seconds());
        tracing::info!("Client disconnected: {} after {}s", self.id, seconds);
    }
}

/// Shared state of the HTTP endpoints
#[derive(Clone)]
pub struct AppState {
    settings: Arc<ServerSettings>,
    dispatcher: Dispatcher,
    connections: ConnectionTracker,
}

impl AppState {
    pub fn new(
        settings: ServerSettings,
        registry: LazyRegistry,
        invoker: Arc<dyn WorkflowInvoker>,
    ) -> Self {
        let settings = Arc::new(settings);
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::clone(&settings), invoker);
        Self {
            settings,
            dispatcher,
            connections: ConnectionTracker::new(),
        }
    }

    pub fn connections(&self) -> &ConnectionTracker {
        &self.connections
    }

    pub fn registry(&self) -> &Arc<LazyRegistry> {
        self.dispatcher.registry()
    }

    /// Reject requests without the configured bearer token
    fn authorize(&self, headers: &HeaderMap) -> std::result::Result<(), Response> {
        let Some(expected) = self.settings.api_key.as_deref() else {
            return Ok(());
        };
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented == Some(expected) {
            Ok(())
        } else {
            tracing::warn!("rejected unauthenticated request");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response())
        }
    }
}

/// HTTP server for the MCP endpoints
pub struct McpHttpServer {
    state: AppState,
    addr: SocketAddr,
}

impl McpHttpServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    /// Build the router
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(get_handler).post(post_handler))
            .route("/mcp", get(get_handler).post(post_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Parse the listen address from host and port
    pub fn bind_address(host: &str, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", host, port).parse().map_err(|e| {
            McpServerError::Config(format!("invalid listen address {}:{}: {}", host, port, e))
        })
    }

    /// Start the server, stopping on Ctrl-C
    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        tracing::info!("MCP server listening on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "tools": state.registry().get().len(),
        "connections": state.connections.count(),
        "version": crate::VERSION,
    }))
}

/// GET: event stream when asked for one, status payload otherwise
async fn get_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query_params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    if !accepts_event_stream(&headers) {
        let name = state
            .settings
            .server_name
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_NAME);
        return Json(json!({
            "status": "success",
            "message": format!("{} is running", name),
            "app_id": state.settings.resolved_app_id().unwrap_or_default(),
            "query_params": query_params,
        }))
        .into_response();
    }

    let guard = state.connections.open();
    let stream = notification_stream(
        guard.id().to_string(),
        Arc::clone(state.registry()),
        state.settings.stream_config(),
        Some(guard),
    )
    .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.to_json())));

    Sse::new(stream).into_response()
}

/// POST: JSON-RPC envelope or legacy workflow call
async fn post_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }

    let ctx = state.settings.call_context();
    let outcome = state.dispatcher.handle_post(&body, &ctx).await;
    (outcome.status, Json(outcome.body)).into_response()
}

/// Whether the Accept header lists `text/event-stream` with a non-zero quality
fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| {
            accept.split(',').any(|entry| {
                let mut parts = entry.split(';');
                let media_type = parts.next().unwrap_or_default().trim();
                media_type.eq_ignore_ascii_case("text/event-stream") && quality(parts) > 0.0
            })
        })
}

/// The `q` parameter of one Accept entry; absent or malformed counts as 1
fn quality<'a>(params: impl Iterator<Item = &'a str>) -> f32 {
    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}
