//! Health check functionality for MCP servers
//!
//! Backs `GET /health` on the HTTP transport so monitoring systems can
//! verify the service is running.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always "healthy" if responding
    pub status: String,

    /// Seconds since Unix epoch
    pub timestamp: u64,

    pub server_name: String,

    pub version: String,

    /// Highest protocol version the server will negotiate
    pub protocol_version: String,

    /// Live sessions; absent in stateless mode
    pub session_count: Option<usize>,

    pub uptime_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct HealthChecker {
    start_time: SystemTime,
    server_name: String,
    version: String,
    protocol_version: String,
}

impl HealthChecker {
    pub fn new(
        server_name: impl Into<String>,
        version: impl Into<String>,
        protocol_version: impl Into<String>,
    ) -> Self {
        Self {
            start_time: SystemTime::now(),
            server_name: server_name.into(),
            version: version.into(),
            protocol_version: protocol_version.into(),
        }
    }

    /// Get current health status
    pub fn get_status(&self, session_count: Option<usize>) -> HealthStatus {
        let now = SystemTime::now();
        let timestamp = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let uptime_seconds = now
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_secs();

        HealthStatus {
            status: "healthy".to_string(),
            timestamp,
            server_name: self.server_name.clone(),
            version: self.version.clone(),
            protocol_version: self.protocol_version.clone(),
            session_count,
            uptime_seconds,
        }
    }

    /// Get a simple JSON health response
    pub fn get_json_status(&self, session_count: Option<usize>) -> serde_json::Value {
        serde_json::to_value(self.get_status(session_count)).unwrap_or_else(|_| {
            serde_json::json!({
                "status": "error",
                "message": "Failed to serialize health status"
            })
        })
    }
}
