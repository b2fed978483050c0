use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::CapabilityKind;
use crate::validation::ValidationIssue;

/// Stable symbol describing the class of a failure.
///
/// Carried in the `data.kind` field of every error envelope and in
/// instrumentation events, so peers and observers can branch on it without
/// parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    CapabilityNotFound,
    InvalidArguments,
    HandlerError,
    Registration,
    Session,
    LimitExceeded,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::InvalidRequest => "invalid_request",
            Self::MethodNotFound => "method_not_found",
            Self::InvalidParams => "invalid_params",
            Self::CapabilityNotFound => "capability_not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::HandlerError => "handler_error",
            Self::Registration => "registration_error",
            Self::Session => "session_error",
            Self::LimitExceeded => "limit_exceeded",
            Self::InternalError => "internal_error",
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum McpError {
    // Protocol Errors
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    // Capability Errors
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Resource not found: {0}")]
    UnknownResource(String),

    #[error("Prompt not found: {0}")]
    UnknownPrompt(String),

    #[error("Invalid arguments: {}", summarize(.0))]
    InvalidArguments(Vec<ValidationIssue>),

    #[error("Capability handler failed")]
    Handler,

    // Registration Errors
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: CapabilityKind, name: String },

    #[error("Method already defined: {0}")]
    MethodAlreadyDefined(String),

    #[error("Method '{method}' cannot be registered as a {shape} handler")]
    MethodShapeMismatch { method: String, shape: &'static str },

    #[error("Schema for '{0}' references an external definition ($ref is not allowed)")]
    DisallowedSchemaRef(String),

    #[error("Invalid schema for '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Invalid URI template '{template}': {reason}")]
    InvalidUriTemplate { template: String, reason: String },

    #[error("Too many {0} registered (max: {1})")]
    TooManyCapabilities(CapabilityKind, usize),

    // Session Errors
    #[error("Missing session identifier")]
    MissingSession,

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Event stream already open for session {0}")]
    StreamAlreadyOpen(String),

    // Limit Errors
    #[error("Too many sessions (max: {0})")]
    TooManySessions(usize),

    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    // IO Errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON Errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal Errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Typed tool input that did not deserialize.
///
/// Raised by the typed-tool wrapper before the user's handler runs. The
/// dispatcher answers it as invalid arguments; every other handler error is
/// reported and answered generically.
#[derive(Debug, Error)]
#[error("Invalid arguments: {}", summarize(.0))]
pub(crate) struct InputRejected(pub(crate) Vec<ValidationIssue>);

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Parse(_) | Self::Json(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::UnknownMethod(_) => -32601,
            Self::InvalidParams(_) | Self::InvalidArguments(_) => -32602,
            Self::UnknownTool(_) | Self::UnknownResource(_) | Self::UnknownPrompt(_) => -32002,
            Self::MissingSession | Self::UnknownSession(_) | Self::StreamAlreadyOpen(_) => -32001,
            Self::TooManySessions(_) | Self::MessageTooLarge(_, _) => -32000,
            _ => -32603, // Internal error
        }
    }

    /// Failure class reported to peers and instrumentation
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) | Self::Json(_) => ErrorKind::ParseError,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::UnknownMethod(_) => ErrorKind::MethodNotFound,
            Self::InvalidParams(_) => ErrorKind::InvalidParams,
            Self::UnknownTool(_) | Self::UnknownResource(_) | Self::UnknownPrompt(_) => {
                ErrorKind::CapabilityNotFound
            }
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::Handler => ErrorKind::HandlerError,
            Self::DuplicateName { .. }
            | Self::MethodAlreadyDefined(_)
            | Self::MethodShapeMismatch { .. }
            | Self::DisallowedSchemaRef(_)
            | Self::InvalidSchema { .. }
            | Self::InvalidUriTemplate { .. }
            | Self::TooManyCapabilities(_, _) => ErrorKind::Registration,
            Self::MissingSession | Self::UnknownSession(_) | Self::StreamAlreadyOpen(_) => {
                ErrorKind::Session
            }
            Self::TooManySessions(_) | Self::MessageTooLarge(_, _) => ErrorKind::LimitExceeded,
            Self::Io(_) | Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Peer-visible message. Internal failures never leak their detail.
    fn public_message(&self) -> String {
        match self {
            Self::Io(_) | Self::Internal(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Create JSON-RPC error response
    pub fn to_json_rpc_error(&self, id: Option<Value>) -> Value {
        let mut data = json!({ "kind": self.kind() });
        if let Self::InvalidArguments(issues) = self {
            data["errors"] = json!(issues);
        }
        json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
                "data": data,
            },
            "id": id.unwrap_or(Value::Null),
        })
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;

// For compatibility with handler code that uses anyhow::Error
impl From<anyhow::Error> for McpError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<McpError>() {
            Ok(mcp) => mcp,
            Err(other) => McpError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_errors_share_class() {
        for err in [
            McpError::UnknownTool("a".into()),
            McpError::UnknownPrompt("b".into()),
            McpError::UnknownResource("c".into()),
        ] {
            assert_eq!(err.kind(), ErrorKind::CapabilityNotFound);
            assert_eq!(err.error_code(), -32002);
        }
    }

    #[test]
    fn test_invalid_arguments_lists_every_issue() {
        let err = McpError::InvalidArguments(vec![
            ValidationIssue::missing("msg"),
            ValidationIssue::type_mismatch("count", "integer", "string"),
        ]);
        let envelope = err.to_json_rpc_error(Some(json!(3)));

        assert_eq!(envelope["id"], 3);
        assert_eq!(envelope["error"]["code"], -32602);
        assert_eq!(envelope["error"]["data"]["kind"], "invalid_arguments");
        assert_eq!(envelope["error"]["data"]["errors"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = McpError::Internal("db password wrong at /etc/secret".into());
        let envelope = err.to_json_rpc_error(None);

        assert_eq!(envelope["error"]["message"], "Internal error");
        assert!(envelope["id"].is_null());
    }

    #[test]
    fn test_anyhow_round_trip_keeps_variant() {
        let wrapped = anyhow::Error::new(McpError::UnknownTool("x".into()));
        let back: McpError = wrapped.into();
        assert!(matches!(back, McpError::UnknownTool(name) if name == "x"));
    }
}
