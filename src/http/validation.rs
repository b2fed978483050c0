//! HTTP Request Validation
//!
//! Transport-level checks that run before a body reaches the dispatcher.

use {
    crate::{
        error::{McpError, McpResult},
        limits::ResourceLimits,
    },
    tracing::{trace, warn},
};

/// Extract content type from headers with fallback
pub fn extract_content_type(content_type: Option<&str>) -> &str {
    content_type.unwrap_or("application/json")
}

/// Reject POST bodies that are not declared as JSON.
///
/// A missing header is accepted. The caller answers a rejection with
/// `415 Unsupported Media Type`.
pub fn validate_content_type(content_type: Option<&str>) -> McpResult<()> {
    let content_type = extract_content_type(content_type);
    if !content_type.to_ascii_lowercase().contains("application/json") {
        warn!(content_type = %content_type, "Rejected non-JSON request body");
        return Err(McpError::InvalidRequest(format!(
            "Invalid Content-Type: {content_type}. Expected application/json"
        )));
    }
    Ok(())
}

pub fn validate_body_size(body_len: usize, limits: &ResourceLimits) -> McpResult<()> {
    limits.check_message_size(body_len)?;
    trace!(
        request_size_bytes = body_len,
        request_size_kb = %format!("{:.2}", body_len as f64 / 1024.0),
        "Request body accepted"
    );
    Ok(())
}

/// Normalize the session header. Blank values count as absent.
pub fn session_id_from_header(header: Option<&str>) -> Option<&str> {
    header.map(str::trim).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert!(validate_content_type(Some("application/json; charset=utf-8")).is_ok());
        assert!(validate_content_type(None).is_ok());
        assert!(matches!(
            validate_content_type(Some("text/plain")),
            Err(McpError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_body_size() {
        let limits = ResourceLimits {
            max_message_size: 16,
            ..ResourceLimits::default()
        };
        assert!(matches!(
            validate_body_size(17, &limits),
            Err(McpError::MessageTooLarge(17, 16))
        ));
        assert!(validate_body_size(16, &limits).is_ok());
    }

    #[test]
    fn test_session_header() {
        assert_eq!(session_id_from_header(Some(" abc ")), Some("abc"));
        assert_eq!(session_id_from_header(Some("  ")), None);
        assert_eq!(session_id_from_header(None), None);
    }
}
