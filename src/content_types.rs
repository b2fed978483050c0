//! Content returned by capability handlers
//!
//! Each content kind is its own variant carrying only the fields valid for
//! that kind. Binary payloads are base64-encoded on construction.
//!
//! ```rust
//! use relaymcp::content_types::{Content, ToolResult};
//! use serde_json::json;
//!
//! let result = ToolResult::text("Found 3 results")
//!     .with_structured_content(json!({ "total": 3 }));
//! assert_eq!(result.content, vec![Content::text("Found 3 results")]);
//! ```

use {
    crate::protocol::{version_at_least, PROTOCOL_2025_06_18},
    base64::{engine::general_purpose::STANDARD, Engine as _},
    serde::{Deserialize, Serialize},
    serde_json::{json, Value},
};

/// One item of an ordered content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        /// Base64 encoded bytes
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource
    Resource { resource: ResourceContents },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::Image {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn audio(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::Audio {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn resource(contents: ResourceContents) -> Self {
        Self::Resource { resource: contents }
    }
}

/// Body of a resource, either text or binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContents {
    Text {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        text: String,
    },
    Blob {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Base64 encoded bytes
        blob: String,
    },
}

impl ResourceContents {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: text.into(),
        }
    }

    pub fn text_with_mime(
        uri: impl Into<String>,
        text: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::Text {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            text: text.into(),
        }
    }

    pub fn blob(uri: impl Into<String>, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::Blob {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            blob: STANDARD.encode(bytes),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Text { uri, .. } | Self::Blob { uri, .. } => uri,
        }
    }
}

/// Result of a tool call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResult {
    pub content: Vec<Content>,
    /// Machine-readable result, sent to peers that negotiated 2025-06-18 or later
    pub structured_content: Option<Value>,
    /// The tool ran but reports a domain failure to the model
    pub is_error: bool,
}

impl ToolResult {
    pub fn new(content: Vec<Content>) -> Self {
        Self {
            content,
            structured_content: None,
            is_error: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Content::text(text)])
    }

    /// A result the model should read as a failure. Unlike a handler error,
    /// the text reaches the peer.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Structured result with its JSON rendering as the text content
    pub fn structured<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        let structured = serde_json::to_value(value)?;
        Ok(Self::text(structured.to_string()).with_structured_content(structured))
    }

    pub fn with_structured_content(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }

    pub fn to_wire(&self, version: &str) -> Value {
        let mut result = json!({ "content": self.content });
        if self.is_error {
            result["isError"] = json!(true);
        }
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(structured) = &self.structured_content {
                result["structuredContent"] = structured.clone();
            }
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }
}

/// Result of `prompts/get`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl PromptResult {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self {
            description: None,
            messages,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PROTOCOL_2025_03_26;

    #[test]
    fn test_content_wire_shapes() {
        assert_eq!(
            serde_json::to_value(Content::text("hi")).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
        assert_eq!(
            serde_json::to_value(Content::image(b"png", "image/png")).unwrap(),
            json!({"type": "image", "data": "cG5n", "mimeType": "image/png"})
        );

        let embedded = Content::resource(ResourceContents::text("file:///a", "body"));
        let wire = serde_json::to_value(embedded).unwrap();
        assert_eq!(wire["type"], "resource");
        assert_eq!(wire["resource"]["uri"], "file:///a");
        assert_eq!(wire["resource"]["text"], "body");
    }

    #[test]
    fn test_blob_contents_decode_as_blob() {
        let blob = ResourceContents::blob("mem://x", &[0, 1, 2], "application/octet-stream");
        let wire = serde_json::to_value(&blob).unwrap();
        let back: ResourceContents = serde_json::from_value(wire).unwrap();
        assert_eq!(back, blob);
        assert_eq!(back.uri(), "mem://x");
    }

    #[test]
    fn test_structured_content_is_version_gated() {
        let result = ToolResult::structured(&json!({"total": 3})).unwrap();

        let old = result.to_wire(PROTOCOL_2025_03_26);
        assert!(old.get("structuredContent").is_none());
        assert_eq!(old["content"][0]["text"], r#"{"total":3}"#);

        let new = result.to_wire(PROTOCOL_2025_06_18);
        assert_eq!(new["structuredContent"]["total"], 3);
        assert!(new.get("isError").is_none());
    }

    #[test]
    fn test_error_result_flag() {
        let wire = ToolResult::error("quota exceeded").to_wire(PROTOCOL_2025_06_18);
        assert_eq!(wire["isError"], true);
        assert_eq!(wire["content"][0]["text"], "quota exceeded");
    }
}
