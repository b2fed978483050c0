//! HTTP Response Building
//!
//! JSON-RPC errors travel in the body with `200 OK`; transport failures
//! (sessions, limits, malformed bodies) also get a matching HTTP status.

use {
    super::SESSION_HEADER,
    crate::error::McpError,
    serde_json::Value,
    tracing::debug,
    warp::{
        http::{HeaderValue, StatusCode},
        reply::{self, Response},
        Reply,
    },
};

/// HTTP status for an error surfaced at the transport level
pub fn status_for(error: &McpError) -> StatusCode {
    match error {
        McpError::Parse(_) | McpError::Json(_) | McpError::MissingSession => StatusCode::BAD_REQUEST,
        McpError::UnknownSession(_) => StatusCode::NOT_FOUND,
        McpError::StreamAlreadyOpen(_) => StatusCode::CONFLICT,
        McpError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
        McpError::MessageTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::OK,
    }
}

pub fn json_response(body: &Value, status: StatusCode) -> Response {
    debug!(status = status.as_u16(), "Built JSON response");
    reply::with_status(reply::json(body), status).into_response()
}

/// Error envelope with the status from [`status_for`]
pub fn error_response(error: &McpError, id: Option<Value>) -> Response {
    json_response(&error.to_json_rpc_error(id), status_for(error))
}

pub fn empty_response(status: StatusCode) -> Response {
    reply::with_status(warp::reply(), status).into_response()
}

pub fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Apply CORS headers to a response
pub fn apply_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization, Mcp-Session-Id, Mcp-Protocol-Version"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static("Mcp-Session-Id"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_statuses() {
        assert_eq!(status_for(&McpError::MissingSession), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&McpError::UnknownSession("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&McpError::StreamAlreadyOpen("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&McpError::TooManySessions(1)), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&McpError::MessageTooLarge(2, 1)), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(status_for(&McpError::UnknownTool("x".into())), StatusCode::OK);
        assert_eq!(status_for(&McpError::InvalidRequest("x".into())), StatusCode::OK);
    }

    #[test]
    fn test_error_response_carries_envelope() {
        let response = error_response(&McpError::UnknownSession("abc".into()), Some(json!(4)));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("content-type").is_some());
    }

    #[test]
    fn test_empty_response_has_no_body() {
        let response = empty_response(StatusCode::ACCEPTED);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(response.headers().get("content-type").is_none());
    }

    #[test]
    fn test_session_and_cors_headers() {
        let response = apply_cors_headers(with_session_header(
            json_response(&json!({}), StatusCode::OK),
            "sess123",
        ));
        assert_eq!(response.headers().get(SESSION_HEADER).unwrap(), "sess123");
        assert_eq!(
            response.headers().get("Access-Control-Expose-Headers").unwrap(),
            "Mcp-Session-Id"
        );
    }
}
