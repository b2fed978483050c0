//! Prompt, resource and resource template registration for CapabilityRegistry.

use {
    super::{CapabilityRegistry, PromptEntry, ResourceEntry, TemplateEntry, UriTemplate},
    crate::{
        error::{McpError, McpResult},
        framework::handler::{PromptHandler, ResourceHandler, TemplateHandler},
        types::{CapabilityKind, PromptDefinition, ResourceDefinition, ResourceTemplateDefinition},
    },
    std::{collections::HashMap, sync::Arc},
    tracing::debug,
};

/// What a `resources/read` URI resolved to
pub enum ResourceTarget<C> {
    Resource(ResourceEntry<C>),
    /// First template, in registration order, whose pattern matched
    Template(TemplateEntry<C>, HashMap<String, String>),
}

impl<C: Send + Sync + 'static> CapabilityRegistry<C> {
    pub fn register_prompt(&self, definition: PromptDefinition, handler: PromptHandler<C>) -> McpResult<()> {
        let name = definition.name.clone();
        let entry = PromptEntry {
            input_schema: definition.input_schema(),
            definition,
            handler,
        };
        self.prompts.insert(name.clone(), entry, &self.limits)?;
        debug!(prompt = %name, "Registered prompt");
        self.changed(CapabilityKind::Prompt);
        Ok(())
    }

    pub fn replace_prompt(&self, definition: PromptDefinition, handler: PromptHandler<C>) -> McpResult<bool> {
        let name = definition.name.clone();
        let entry = PromptEntry {
            input_schema: definition.input_schema(),
            definition,
            handler,
        };
        let replaced = self.prompts.upsert(name, entry, &self.limits)?;
        self.changed(CapabilityKind::Prompt);
        Ok(replaced)
    }

    pub fn unregister_prompt(&self, name: &str) -> McpResult<()> {
        self.prompts
            .remove(name)
            .ok_or_else(|| McpError::UnknownPrompt(name.to_string()))?;
        self.changed(CapabilityKind::Prompt);
        Ok(())
    }

    pub fn list_prompts(&self) -> Vec<PromptDefinition> {
        self.prompts
            .snapshot()
            .into_iter()
            .map(|entry| entry.definition)
            .collect()
    }

    pub fn prompt(&self, name: &str) -> McpResult<PromptEntry<C>> {
        self.prompts
            .get(name)
            .ok_or_else(|| McpError::UnknownPrompt(name.to_string()))
    }

    /// Register a concrete resource, keyed by its URI
    pub fn register_resource(&self, definition: ResourceDefinition, handler: ResourceHandler<C>) -> McpResult<()> {
        let uri = definition.uri.clone();
        self.resources
            .insert(uri.clone(), ResourceEntry { definition, handler }, &self.limits)?;
        debug!(uri = %uri, "Registered resource");
        self.changed(CapabilityKind::Resource);
        Ok(())
    }

    pub fn replace_resource(&self, definition: ResourceDefinition, handler: ResourceHandler<C>) -> McpResult<bool> {
        let uri = definition.uri.clone();
        let replaced = self
            .resources
            .upsert(uri, ResourceEntry { definition, handler }, &self.limits)?;
        self.changed(CapabilityKind::Resource);
        Ok(replaced)
    }

    pub fn unregister_resource(&self, uri: &str) -> McpResult<()> {
        self.resources
            .remove(uri)
            .ok_or_else(|| McpError::UnknownResource(uri.to_string()))?;
        self.changed(CapabilityKind::Resource);
        Ok(())
    }

    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        self.resources
            .snapshot()
            .into_iter()
            .map(|entry| entry.definition)
            .collect()
    }

    /// Register a resource template, keyed by name. The URI template is
    /// compiled here, so a malformed one never reaches dispatch.
    pub fn register_resource_template(
        &self,
        definition: ResourceTemplateDefinition,
        handler: TemplateHandler<C>,
    ) -> McpResult<()> {
        let template = Arc::new(UriTemplate::parse(&definition.uri_template)?);
        let name = definition.name.clone();
        let entry = TemplateEntry {
            definition,
            template,
            handler,
        };
        self.templates.insert(name.clone(), entry, &self.limits)?;
        debug!(template = %name, "Registered resource template");
        self.changed(CapabilityKind::ResourceTemplate);
        Ok(())
    }

    pub fn unregister_resource_template(&self, name: &str) -> McpResult<()> {
        self.templates
            .remove(name)
            .ok_or_else(|| McpError::UnknownResource(name.to_string()))?;
        self.changed(CapabilityKind::ResourceTemplate);
        Ok(())
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateDefinition> {
        self.templates
            .snapshot()
            .into_iter()
            .map(|entry| entry.definition)
            .collect()
    }

    /// Resolve a URI: exact resources win, then templates in registration order.
    pub fn resolve_resource(&self, uri: &str) -> McpResult<ResourceTarget<C>> {
        if let Some(entry) = self.resources.get(uri) {
            return Ok(ResourceTarget::Resource(entry));
        }
        self.templates
            .snapshot()
            .into_iter()
            .find_map(|entry| {
                let values = entry.template.matches(uri)?;
                Some(ResourceTarget::Template(entry, values))
            })
            .ok_or_else(|| McpError::UnknownResource(uri.to_string()))
    }
}
