//! MCP Debug Logging Module
//!
//! Structured logging for the MCP server using the tracing crate.
//! Output always goes to stderr: on the stdio transport, stdout carries
//! protocol frames only.

use {
    std::time::{Duration, Instant},
    tracing::{debug, error, info, span, warn, Level, Span},
    tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
    uuid::Uuid,
};

/// Initialize the tracing subscriber with appropriate configuration.
///
/// `RUST_LOG` selects levels (default `relaymcp=info`); `LOG_FORMAT=json`
/// switches to JSON lines. Calling this twice is harmless.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relaymcp=info,warp=info"));

    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let installed = if json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_level(true)
            .with_ansi(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    if installed.is_ok() {
        info!("Tracing initialized");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpConnectionId(pub String);

impl McpConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for McpConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for McpConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create a span for tracking a connection lifecycle
pub fn connection_span(connection_id: &McpConnectionId) -> Span {
    span!(
        Level::INFO,
        "mcp_connection",
        connection_id = %connection_id,
        start_time = ?Instant::now()
    )
}

/// Create a span for tracking a request
pub fn request_span(method: &str, request_id: &str, session_id: Option<&str>) -> Span {
    span!(
        Level::INFO,
        "mcp_request",
        method = %method,
        request_id = %request_id,
        session_id = session_id,
    )
}

pub fn log_connection_opened(connection_id: &McpConnectionId, transport: &str) {
    info!(
        connection_id = %connection_id,
        transport = %transport,
        event = "connection_opened",
        "Connection opened"
    );
}

pub fn log_connection_closed(connection_id: &McpConnectionId, duration: Duration) {
    info!(
        connection_id = %connection_id,
        event = "connection_closed",
        duration_ms = duration.as_millis() as u64,
        "Connection closed"
    );
}

/// Log error events with context
pub fn log_parse_error(error: &str, raw_message: &str) {
    error!(
        error = %error,
        raw_message = %raw_message,
        event = "parse_error",
        "Failed to parse message"
    );
}

pub fn log_unknown_method(method: &str) {
    warn!(
        method = %method,
        event = "unknown_method",
        "Unknown MCP method requested"
    );
}

/// Session lifecycle logging
pub fn log_session_created(session_id: &str) {
    info!(
        session_id = %session_id,
        event = "session_created",
        "Session created"
    );
}

pub fn log_session_closed(session_id: &str, reason: &str) {
    info!(
        session_id = %session_id,
        reason = %reason,
        event = "session_closed",
        "Session closed"
    );
}

pub fn log_notification_dropped(session_id: &str, capacity: usize) {
    warn!(
        session_id = %session_id,
        capacity = capacity,
        event = "notification_dropped",
        "Notification queue full, dropped oldest entry"
    );
}

/// Server lifecycle logging
pub fn log_server_startup(port: u16) {
    info!(
        port = port,
        event = "server_startup",
        "Starting MCP Server"
    );
}

pub fn log_server_ready(addr: &str) {
    info!(
        address = %addr,
        event = "server_ready",
        "MCP Server ready and listening"
    );
}

pub fn log_server_shutdown() {
    info!(event = "server_shutdown", "MCP Server shutting down");
}

pub fn log_message_received(transport: &str, message_size: usize) {
    debug!(
        transport = %transport,
        message_size = message_size,
        event = "message_received",
        "Received message"
    );
}
