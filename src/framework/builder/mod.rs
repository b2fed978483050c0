//! Server builder for creating MCP servers with minimal boilerplate.
//!
//! Registrations are recorded in call order and applied when
//! [`McpServerBuilder::build`] runs, after the configuration (and with it the
//! resource limits) is final. The first failing registration aborts the
//! build, so a duplicate name or a bad schema surfaces before any request
//! can be served.

mod provider_methods;
mod tool_methods;


use {
    crate::{
        config::ServerConfig,
        dispatcher::McpDispatcher,
        error::McpResult,
        framework::{
            handler::MethodHandler,
            notification::{NotificationCtx, Notifier},
            registry::CapabilityRegistry,
        },
        instrumentation::InstrumentationEvent,
        limits::ResourceLimits,
        server::McpServer,
        types::CapabilityKind,
    },
    serde_json::Value,
    std::{future::Future, sync::Arc},
    tracing::info,
};

type Registration<C> = Box<dyn FnOnce(&McpDispatcher<C>) -> McpResult<()>>;

/// Convenience builder for creating MCP servers.
///
/// # Type Parameters
/// - `C`: The application context shared with every handler
///
/// # Examples
/// ```rust
/// use relaymcp::{McpServerBuilder, ToolResult};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(JsonSchema, Deserialize)]
/// struct EchoInput {
///     msg: String,
/// }
///
/// let server = McpServerBuilder::new((), "echo-server", "1.0.0")
///     .with_tool("echo", "Echo a message", |input: EchoInput, _ctx, _notif| async move {
///         Ok(ToolResult::text(input.msg))
///     })
///     .build()
///     .unwrap();
/// assert_eq!(server.registry().list_tools().len(), 1);
/// ```
pub struct McpServerBuilder<C> {
    context: C,
    config: ServerConfig<C>,
    registrations: Vec<Registration<C>>,
}

impl<C: Send + Sync + 'static> McpServerBuilder<C> {
    /// Start a builder around the application context.
    ///
    /// The context is wrapped in an `Arc` at build time and handed unchanged
    /// to every handler.
    pub fn new(context: C, server_name: &str, server_version: &str) -> Self {
        Self {
            context,
            config: ServerConfig::new(server_name, server_version),
            registrations: Vec::new(),
        }
    }

    pub(super) fn register<F>(mut self, registration: F) -> Self
    where
        F: FnOnce(&McpDispatcher<C>) -> McpResult<()> + 'static,
    {
        self.registrations.push(Box::new(registration));
        self
    }

    /// Replace the whole configuration at once
    pub fn with_config(mut self, config: ServerConfig<C>) -> Self {
        self.config = config;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.config = self.config.with_title(title);
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.config = self.config.with_instructions(instructions);
        self
    }

    pub fn with_protocol_version(mut self, version: &str) -> Self {
        self.config = self.config.with_protocol_version(version);
        self
    }

    /// Turn schema validation of tool and prompt arguments on or off
    pub fn with_argument_validation(mut self, enabled: bool) -> Self {
        self.config = self.config.with_argument_validation(enabled);
        self
    }

    /// Observe handler failures. The reporter must not panic; if it does,
    /// the panic is contained and logged.
    pub fn with_exception_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&anyhow::Error, &C) + Send + Sync + 'static,
    {
        self.config = self.config.with_exception_reporter(reporter);
        self
    }

    pub fn with_instrumentation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InstrumentationEvent) + Send + Sync + 'static,
    {
        self.config = self.config.with_instrumentation(hook);
        self
    }

    /// Configure resource limits for the server.
    ///
    /// # Examples
    /// ```rust
    /// use relaymcp::{McpServerBuilder, ResourceLimits};
    ///
    /// let server = McpServerBuilder::new((), "server", "1.0.0")
    ///     .with_limits(ResourceLimits {
    ///         max_sessions: Some(1000),
    ///         max_message_size: 1024 * 1024, // 1MB
    ///         ..Default::default()
    ///     })
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(server.config().limits.max_sessions, Some(1000));
    /// ```
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.config = self.config.with_limits(limits);
        self
    }

    /// Define a custom JSON-RPC method that returns a result
    pub fn with_method<F, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let name = name.to_string();
        let handler = MethodHandler::request(handler);
        self.register(move |dispatcher| dispatcher.define_method(&name, handler))
    }

    /// Define a handler for a `notifications/*` method
    pub fn with_notification_method<F, Fut>(self, name: &str, handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.to_string();
        let handler = MethodHandler::notification(handler);
        self.register(move |dispatcher| dispatcher.define_method(&name, handler))
    }

    /// Build the server, applying every registration in order.
    ///
    /// # Errors
    /// The first registration error: duplicate names, duplicate methods,
    /// schemas with `$ref`, malformed URI templates, or exceeded limits.
    pub fn build(self) -> McpResult<McpServer<C>> {
        let config = Arc::new(self.config);
        let registry = Arc::new(CapabilityRegistry::new(config.limits.clone(), Notifier::new()));
        let dispatcher = McpDispatcher::new(Arc::new(self.context), config, registry);

        for registration in self.registrations {
            registration(&dispatcher)?;
        }

        let registry = dispatcher.registry();
        info!(
            server = %dispatcher.config().info.name,
            tools = registry.count(CapabilityKind::Tool),
            prompts = registry.count(CapabilityKind::Prompt),
            resources = registry.count(CapabilityKind::Resource),
            templates = registry.count(CapabilityKind::ResourceTemplate),
            "MCP server built"
        );
        Ok(McpServer::new(Arc::new(dispatcher)))
    }
}
