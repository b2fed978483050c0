//! Prompt and resource registration methods for McpServerBuilder.

use {
    crate::{
        content_types::{PromptResult, ResourceContents},
        framework::{
            builder::McpServerBuilder,
            handler::{prompt_handler, resource_handler, template_handler},
            notification::NotificationCtx,
        },
        types::{PromptDefinition, ResourceDefinition, ResourceTemplateDefinition},
    },
    serde_json::Value,
    std::{collections::HashMap, future::Future, sync::Arc},
};

impl<C: Send + Sync + 'static> McpServerBuilder<C> {
    /// Register a prompt. Declared arguments are validated before the
    /// handler runs; the handler gets them as a JSON object of strings.
    pub fn with_prompt<F, Fut>(self, definition: PromptDefinition, handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<PromptResult>> + Send + 'static,
    {
        let handler = prompt_handler(handler);
        self.register(move |dispatcher| dispatcher.registry().register_prompt(definition, handler))
    }

    /// Register a resource served at exactly `definition.uri`
    pub fn with_resource<F, Fut>(self, definition: ResourceDefinition, handler: F) -> Self
    where
        F: Fn(String, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<ResourceContents>>> + Send + 'static,
    {
        let handler = resource_handler(handler);
        self.register(move |dispatcher| dispatcher.registry().register_resource(definition, handler))
    }

    /// Register a resource template such as `file:///{+path}`.
    ///
    /// Reads that match no exact resource are tried against templates in
    /// registration order; the handler receives the placeholder values.
    pub fn with_resource_template<F, Fut>(self, definition: ResourceTemplateDefinition, handler: F) -> Self
    where
        F: Fn(String, HashMap<String, String>, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<ResourceContents>>> + Send + 'static,
    {
        let handler = template_handler(handler);
        self.register(move |dispatcher| {
            dispatcher
                .registry()
                .register_resource_template(definition, handler)
        })
    }
}
