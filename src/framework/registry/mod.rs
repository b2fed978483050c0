//! Capability registry for tools, prompts, resources and resource templates.
//!
//! One ordered table per capability kind. Listing order is registration order
//! and is what peers see. Every mutation happens under the table's write lock
//! in one step, so a concurrent `list` sees either the old or the new state.
//! Mutations broadcast a list-changed notification once the lock is released.

mod provider_registration;
mod tool_registration;
mod uri_template;

pub use provider_registration::ResourceTarget;
pub use uri_template::UriTemplate;

use {
    super::{
        handler::{PromptHandler, ResourceHandler, TemplateHandler, ToolHandler},
        notification::Notifier,
    },
    crate::{
        error::{McpError, McpResult},
        limits::ResourceLimits,
        types::{
            CapabilityKind, PromptDefinition, ResourceDefinition, ResourceTemplateDefinition,
            ToolDefinition,
        },
    },
    indexmap::IndexMap,
    serde_json::Value,
    std::sync::{Arc, RwLock},
};

/// A registered tool with its handler
pub struct ToolEntry<C> {
    pub definition: ToolDefinition,
    pub handler: ToolHandler<C>,
}

pub struct PromptEntry<C> {
    pub definition: PromptDefinition,
    /// Schema derived from the declared arguments
    pub input_schema: Value,
    pub handler: PromptHandler<C>,
}

pub struct ResourceEntry<C> {
    pub definition: ResourceDefinition,
    pub handler: ResourceHandler<C>,
}

pub struct TemplateEntry<C> {
    pub definition: ResourceTemplateDefinition,
    pub template: Arc<UriTemplate>,
    pub handler: TemplateHandler<C>,
}

impl<C> Clone for ToolEntry<C> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> Clone for PromptEntry<C> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            input_schema: self.input_schema.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> Clone for ResourceEntry<C> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> Clone for TemplateEntry<C> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            template: self.template.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Ordered, lock-guarded map of one capability kind
struct Table<E> {
    kind: CapabilityKind,
    entries: RwLock<IndexMap<String, E>>,
}

impl<E: Clone> Table<E> {
    fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    fn insert(&self, key: String, entry: E, limits: &ResourceLimits) -> McpResult<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.contains_key(&key) {
            return Err(McpError::DuplicateName {
                kind: self.kind,
                name: key,
            });
        }
        limits.check_capacity(self.kind, entries.len())?;
        entries.insert(key, entry);
        Ok(())
    }

    /// Insert or replace. A replaced entry keeps its position.
    fn upsert(&self, key: String, entry: E, limits: &ResourceLimits) -> McpResult<bool> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(slot) = entries.get_mut(&key) {
            *slot = entry;
            return Ok(true);
        }
        limits.check_capacity(self.kind, entries.len())?;
        entries.insert(key, entry);
        Ok(false)
    }

    fn remove(&self, key: &str) -> Option<E> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .shift_remove(key)
    }

    fn get(&self, key: &str) -> Option<E> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn snapshot(&self) -> Vec<E> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Registry for managing tools, resources, and prompts within a server instance.
///
/// Shared between the dispatcher and the embedding application; all methods
/// take `&self` and are safe to call from any thread.
///
/// # Type Parameters
/// - `C`: The application context type shared across all registered handlers
pub struct CapabilityRegistry<C> {
    tools: Table<ToolEntry<C>>,
    prompts: Table<PromptEntry<C>>,
    resources: Table<ResourceEntry<C>>,
    templates: Table<TemplateEntry<C>>,
    limits: ResourceLimits,
    notifier: Notifier,
}

impl<C> CapabilityRegistry<C> {
    /// Create an empty registry that reports changes through `notifier`.
    pub fn new(limits: ResourceLimits, notifier: Notifier) -> Self {
        Self {
            tools: Table::new(CapabilityKind::Tool),
            prompts: Table::new(CapabilityKind::Prompt),
            resources: Table::new(CapabilityKind::Resource),
            templates: Table::new(CapabilityKind::ResourceTemplate),
            limits,
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Number of registered capabilities of `kind`
    pub fn count(&self, kind: CapabilityKind) -> usize {
        match kind {
            CapabilityKind::Tool => self.tools.len(),
            CapabilityKind::Prompt => self.prompts.len(),
            CapabilityKind::Resource => self.resources.len(),
            CapabilityKind::ResourceTemplate => self.templates.len(),
        }
    }

    fn changed(&self, kind: CapabilityKind) {
        self.notifier.list_changed(kind);
    }
}

impl<C> Default for CapabilityRegistry<C> {
    fn default() -> Self {
        Self::new(ResourceLimits::default(), Notifier::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_keeps_registration_order_on_replace() {
        let table = Table::new(CapabilityKind::Tool);
        let limits = ResourceLimits::default();
        table.insert("b".into(), 1, &limits).unwrap();
        table.insert("a".into(), 2, &limits).unwrap();
        table.insert("c".into(), 3, &limits).unwrap();

        assert!(table.upsert("a".into(), 20, &limits).unwrap());
        assert_eq!(table.snapshot(), vec![1, 20, 3]);

        table.remove("b");
        assert_eq!(table.snapshot(), vec![20, 3]);
    }

    #[test]
    fn test_table_rejects_duplicates_without_change() {
        let table = Table::new(CapabilityKind::Prompt);
        let limits = ResourceLimits::default();
        table.insert("dup".into(), 1, &limits).unwrap();

        let err = table.insert("dup".into(), 2, &limits).unwrap_err();
        assert!(matches!(
            err,
            McpError::DuplicateName { kind: CapabilityKind::Prompt, ref name } if name == "dup"
        ));
        assert_eq!(table.get("dup"), Some(1));
    }

    #[test]
    fn test_table_enforces_limits() {
        let table = Table::new(CapabilityKind::Tool);
        let limits = ResourceLimits {
            max_tools: Some(1),
            ..ResourceLimits::default()
        };
        table.insert("one".into(), 1, &limits).unwrap();
        assert!(matches!(
            table.insert("two".into(), 2, &limits),
            Err(McpError::TooManyCapabilities(CapabilityKind::Tool, 1))
        ));
        // Replacing in place does not grow the table
        assert!(table.upsert("one".into(), 10, &limits).is_ok());
    }
}
