//! High-level framework for building MCP (Model Context Protocol) servers with minimal boilerplate.
//!
//! Capabilities live in a [`CapabilityRegistry`]; handlers are async closures
//! that receive their arguments, the shared application context, and a
//! [`NotificationCtx`] for talking back to the peer.
//!
//! # Quick Start
//!
//! ```rust
//! use relaymcp::framework::{McpServerBuilder, NotificationCtx};
//! use relaymcp::ToolResult;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(JsonSchema, Deserialize)]
//! struct CalculateInput {
//!     a: f64,
//!     b: f64,
//!     operation: String,
//! }
//!
//! struct AppContext {
//!     precision: usize,
//! }
//!
//! let server = McpServerBuilder::new(AppContext { precision: 2 }, "calculator", "1.0.0")
//!     .with_tool("calculate", "Perform basic arithmetic", |input: CalculateInput, ctx: Arc<AppContext>, notif: NotificationCtx| async move {
//!         notif.info(format!("Calculating {} {} {}", input.a, input.operation, input.b))?;
//!         let result = match input.operation.as_str() {
//!             "add" => input.a + input.b,
//!             "subtract" => input.a - input.b,
//!             "multiply" => input.a * input.b,
//!             "divide" => input.a / input.b,
//!             _ => return Ok(ToolResult::error("Unknown operation")),
//!         };
//!         Ok(ToolResult::text(format!("{result:.prec$}", prec = ctx.precision)))
//!     })
//!     .build()
//!     .unwrap();
//! # let _ = server;
//! ```

pub mod builder;
pub mod handler;
pub mod notification;
pub mod registry;

pub use builder::McpServerBuilder;
pub use handler::MethodHandler;
pub use notification::{LogLevel, McpNotification, NotificationCtx, NotificationSink, Notifier};
pub use registry::CapabilityRegistry;
