//! Tool registration methods for McpServerBuilder.

use {
    crate::{
        content_types::ToolResult,
        framework::{builder::McpServerBuilder, handler::tool_handler, notification::NotificationCtx},
        types::ToolDefinition,
    },
    schemars::JsonSchema,
    serde::{de::DeserializeOwned, Serialize},
    serde_json::Value,
    std::{future::Future, sync::Arc},
};

impl<C: Send + Sync + 'static> McpServerBuilder<C> {
    /// Register a tool whose input schema is derived from `I`.
    ///
    /// Arguments are validated against the derived schema, then deserialized
    /// into `I` before the handler runs.
    ///
    /// # Examples
    /// ```rust
    /// use relaymcp::{McpServerBuilder, ToolResult};
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    ///
    /// #[derive(JsonSchema, Deserialize)]
    /// struct SearchInput {
    ///     query: String,
    ///     limit: Option<u32>,
    /// }
    ///
    /// let server = McpServerBuilder::new((), "search-server", "1.0.0")
    ///     .with_tool("search", "Search the knowledge base", |input: SearchInput, _ctx, notif| async move {
    ///         notif.info(format!("Searching for: {}", input.query))?;
    ///         Ok(ToolResult::text(format!("no results for {}", input.query)))
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # let _ = server;
    /// ```
    pub fn with_tool<I, F, Fut>(self, name: &str, description: &str, handler: F) -> Self
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(I, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        let name = name.to_string();
        let description = description.to_string();
        self.register(move |dispatcher| {
            dispatcher
                .registry()
                .register_typed_tool(&name, &description, handler)
        })
    }

    /// Register a tool with typed input and output.
    ///
    /// The output schema is advertised as `outputSchema` and each result is
    /// returned as structured content.
    pub fn with_structured_tool<I, O, F, Fut>(self, name: &str, description: &str, handler: F) -> Self
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: JsonSchema + Serialize + Send + 'static,
        F: Fn(I, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        let name = name.to_string();
        let description = description.to_string();
        self.register(move |dispatcher| {
            dispatcher
                .registry()
                .register_structured_tool(&name, &description, handler)
        })
    }

    /// Register a tool from a hand-written definition. The handler receives
    /// the raw argument object.
    pub fn with_tool_definition<F, Fut>(self, definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        let handler = tool_handler(handler);
        self.register(move |dispatcher| dispatcher.registry().register_tool(definition, handler))
    }
}
