//! MCP protocol versions and JSON-RPC envelopes
//!
//! Versions are ISO dates, so lexical order is chronological order.

pub mod message;

pub use message::{
    DecodeError, Incoming, InitializeParams, PromptGetParams, Request, ResourceReadParams,
    ToolCallParams,
};

use serde_json::{json, Value};

pub const PROTOCOL_2024_11_05: &str = "2024-11-05";
pub const PROTOCOL_2025_03_26: &str = "2025-03-26";
pub const PROTOCOL_2025_06_18: &str = "2025-06-18";
pub const PROTOCOL_2025_11_25: &str = "2025-11-25";

/// Every version this crate can speak, oldest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[
    PROTOCOL_2024_11_05,
    PROTOCOL_2025_03_26,
    PROTOCOL_2025_06_18,
    PROTOCOL_2025_11_25,
];

/// Default configured maximum
pub const DEFAULT_PROTOCOL_VERSION: &str = PROTOCOL_2025_06_18;

pub fn version_at_least(version: &str, minimum: &str) -> bool {
    version >= minimum
}

pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Confirm the client's proposal or downgrade to the configured maximum.
pub fn negotiate_version(requested: Option<&str>, maximum: &str) -> String {
    match requested {
        Some(version) if is_supported_version(version) && version <= maximum => version.to_string(),
        _ => maximum.to_string(),
    }
}

/// Create success response
pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Create a server-to-client notification (no `id`)
pub fn notification_envelope(method: &str, params: Option<Value>) -> Value {
    match params {
        Some(params) => json!({ "jsonrpc": "2.0", "method": method, "params": params }),
        None => json!({ "jsonrpc": "2.0", "method": method }),
    }
}
