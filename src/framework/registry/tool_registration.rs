//! Tool registration methods for CapabilityRegistry.
//!
//! This module contains all tool registration methods including register_tool,
//! the typed variants with derived schemas, replacement and removal.

use {
    super::{CapabilityRegistry, ToolEntry},
    crate::{
        content_types::ToolResult,
        error::{InputRejected, McpError, McpResult},
        framework::{
            handler::{tool_handler, ToolHandler},
            notification::NotificationCtx,
        },
        types::{schema_for_type, CapabilityKind, ToolDefinition},
        validation::{SchemaValidator, ValidationIssue},
    },
    schemars::JsonSchema,
    serde::{de::DeserializeOwned, Serialize},
    serde_json::Value,
    std::{future::Future, sync::Arc},
    tracing::debug,
};

/// Deserialize validated arguments into the tool's input type.
///
/// A mismatch here is the caller's fault, so it surfaces as invalid arguments
/// rather than a handler failure.
pub(crate) fn decode_input<I: DeserializeOwned>(args: Value) -> Result<I, InputRejected> {
    serde_json::from_value(args).map_err(|e| {
        InputRejected(vec![ValidationIssue::type_mismatch(
            "$",
            "arguments matching the input schema",
            &e.to_string(),
        )])
    })
}

fn check_definition(definition: &ToolDefinition) -> McpResult<()> {
    SchemaValidator::check_schema(&definition.name, &definition.input_schema)?;
    if let Some(output_schema) = &definition.output_schema {
        SchemaValidator::check_schema(&definition.name, output_schema)?;
    }
    Ok(())
}

impl<C: Send + Sync + 'static> CapabilityRegistry<C> {
    /// Register a tool with an explicit definition.
    ///
    /// Fails with `DuplicateName` if a tool of that name exists; the existing
    /// tool is left untouched. Use [`replace_tool`](Self::replace_tool) for an
    /// intentional re-registration.
    pub fn register_tool(&self, definition: ToolDefinition, handler: ToolHandler<C>) -> McpResult<()> {
        check_definition(&definition)?;
        let name = definition.name.clone();
        self.tools
            .insert(name.clone(), ToolEntry { definition, handler }, &self.limits)?;
        debug!(tool = %name, "Registered tool");
        self.changed(CapabilityKind::Tool);
        Ok(())
    }

    /// Register or re-register a tool. Returns whether a tool was replaced.
    pub fn replace_tool(&self, definition: ToolDefinition, handler: ToolHandler<C>) -> McpResult<bool> {
        check_definition(&definition)?;
        let name = definition.name.clone();
        let replaced = self
            .tools
            .upsert(name.clone(), ToolEntry { definition, handler }, &self.limits)?;
        debug!(tool = %name, replaced, "Re-registered tool");
        self.changed(CapabilityKind::Tool);
        Ok(replaced)
    }

    pub fn unregister_tool(&self, name: &str) -> McpResult<()> {
        self.tools
            .remove(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        debug!(tool = %name, "Unregistered tool");
        self.changed(CapabilityKind::Tool);
        Ok(())
    }

    /// Register a tool whose input schema is derived from `I`.
    ///
    /// # Examples
    /// ```rust
    /// use relaymcp::{content_types::ToolResult, framework::registry::CapabilityRegistry};
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    ///
    /// #[derive(JsonSchema, Deserialize)]
    /// struct SearchInput {
    ///     query: String,
    ///     limit: Option<u32>,
    /// }
    ///
    /// let registry: CapabilityRegistry<()> = CapabilityRegistry::default();
    /// registry
    ///     .register_typed_tool("search", "Search the knowledge base", |input: SearchInput, _ctx, _notif| async move {
    ///         Ok(ToolResult::text(format!("searching for {}", input.query)))
    ///     })
    ///     .unwrap();
    /// ```
    pub fn register_typed_tool<I, F, Fut>(&self, name: &str, description: &str, handler: F) -> McpResult<()>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(I, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        let definition = ToolDefinition::from_schema::<I>(name, description);
        self.register_tool(definition, typed_tool_handler(handler))
    }

    /// Register a tool with both input and output schema types.
    ///
    /// The handler's output becomes the call's structured content, and its
    /// JSON text the call's text content.
    pub fn register_structured_tool<I, O, F, Fut>(&self, name: &str, description: &str, handler: F) -> McpResult<()>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: JsonSchema + Serialize + Send + 'static,
        F: Fn(I, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        let definition = ToolDefinition::from_schema::<I>(name, description)
            .with_output_schema(schema_for_type::<O>());
        let handler = Arc::new(handler);
        let wrapper = tool_handler(move |args: Value, context: Arc<C>, notif: NotificationCtx| {
            let handler = Arc::clone(&handler);
            async move {
                let input: I = decode_input(args)?;
                let output = handler(input, context, notif).await?;
                Ok(ToolResult::structured(&output)?)
            }
        });
        self.register_tool(definition, wrapper)
    }

    /// Definitions in registration order
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .snapshot()
            .into_iter()
            .map(|entry| entry.definition)
            .collect()
    }

    pub fn tool(&self, name: &str) -> McpResult<ToolEntry<C>> {
        self.tools
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))
    }
}

/// Wrap a typed handler so it accepts the raw argument map.
pub(crate) fn typed_tool_handler<C, I, F, Fut>(handler: F) -> ToolHandler<C>
where
    C: Send + Sync + 'static,
    I: DeserializeOwned + Send + 'static,
    F: Fn(I, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    let handler = Arc::new(handler);
    tool_handler(move |args: Value, context: Arc<C>, notif: NotificationCtx| {
        let handler = Arc::clone(&handler);
        async move {
            let input: I = decode_input(args)?;
            handler(input, context, notif).await
        }
    })
}
