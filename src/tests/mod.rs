//! MCP Server Tests
//!
//! Dispatcher-level tests that drive whole envelopes through the registry,
//! validator and notification plumbing without a transport.

mod dispatcher_tests;

use {
    crate::{
        config::ServerConfig,
        content_types::ToolResult,
        dispatcher::McpDispatcher,
        framework::{
            handler::tool_handler,
            notification::{NotificationSink, Notifier},
            registry::CapabilityRegistry,
        },
        types::ToolDefinition,
    },
    serde_json::{json, Value},
    std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Shared state handed to handlers in these tests
#[derive(Debug, Default)]
pub(crate) struct TestContext {
    pub echo_calls: AtomicUsize,
}

/// Records every delivered envelope with its target
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub delivered: Mutex<Vec<(Option<String>, Value)>>,
}

impl RecordingSink {
    pub fn methods(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, envelope)| envelope["method"].as_str().map(str::to_string))
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, target: Option<&str>, envelope: Value) {
        self.delivered
            .lock()
            .unwrap()
            .push((target.map(str::to_string), envelope));
    }
}

pub(crate) fn echo_definition() -> ToolDefinition {
    ToolDefinition::new(
        "echo",
        "Echo a message",
        json!({
            "type": "object",
            "properties": {"msg": {"type": "string"}},
            "required": ["msg"]
        }),
    )
}

/// Dispatcher with a call-counting `echo` tool
pub(crate) fn echo_dispatcher(config: ServerConfig<TestContext>) -> McpDispatcher<TestContext> {
    let registry = Arc::new(CapabilityRegistry::new(config.limits.clone(), Notifier::new()));
    registry
        .register_tool(
            echo_definition(),
            tool_handler(|args: Value, ctx: Arc<TestContext>, _notif| async move {
                ctx.echo_calls.fetch_add(1, Ordering::SeqCst);
                Ok(ToolResult::text(args["msg"].as_str().unwrap_or_default()))
            }),
        )
        .unwrap();
    McpDispatcher::new(Arc::new(TestContext::default()), Arc::new(config), registry)
}

pub(crate) fn test_config() -> ServerConfig<TestContext> {
    ServerConfig::new("test-server", "0.1.0")
}

pub(crate) fn request(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

pub(crate) fn notification(method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "method": method, "params": params})
}
