//! MCP (Model Context Protocol) Server Library
//!
//! A capability registry, a schema-validating method dispatcher, and two
//! interchangeable transports: line-delimited stdio and session-based HTTP
//! with an event stream for server notifications.

pub mod config;
pub mod content_types;
pub mod dispatcher;
pub mod error;
pub mod framework;
pub mod health;
pub mod http;
pub mod instrumentation;
pub mod limits;
pub mod logging;
pub mod peer;
pub mod protocol;
pub mod server;
pub mod stdio;
pub mod types;
pub mod validation;

// Test modules
#[cfg(test)]
mod tests;

// Re-export key types
pub use config::{ServerConfig, ServerInfo};
pub use content_types::{Content, PromptMessage, PromptResult, ResourceContents, Role, ToolResult};
pub use dispatcher::McpDispatcher;
pub use error::{ErrorKind, McpError, McpResult};
pub use framework::{McpServerBuilder, NotificationCtx};
pub use http::{HttpMode, HttpTransport};
pub use instrumentation::InstrumentationEvent;
pub use limits::ResourceLimits;
pub use peer::PeerState;
pub use server::McpServer;
pub use stdio::{CloseHandle, StdioTransport};
pub use types::{
    PromptArgument, PromptDefinition, ResourceDefinition, ResourceTemplateDefinition,
    ToolAnnotations, ToolDefinition,
};

// Re-export schemars so users derive schemas against the same version
pub use schemars::JsonSchema;
