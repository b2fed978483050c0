//! Core types for the MCP protocol
//!
//! Capability definitions exposed through the registry. Each definition knows
//! how to render itself for a negotiated protocol version; fields the version
//! does not know about are omitted rather than rejected.

use {
    crate::protocol::{version_at_least, PROTOCOL_2025_03_26, PROTOCOL_2025_06_18},
    schemars::{generate::SchemaSettings, JsonSchema},
    serde::{Deserialize, Serialize},
    serde_json::{json, Map, Value},
};

/// The four kinds of capability a server can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
    ResourceTemplate,
}

impl CapabilityKind {
    /// Method of the list-changed notification for this kind, if any.
    ///
    /// Templates share the resources notification.
    pub fn list_changed_method(&self) -> &'static str {
        match self {
            Self::Tool => "notifications/tools/list_changed",
            Self::Prompt => "notifications/prompts/list_changed",
            Self::Resource | Self::ResourceTemplate => "notifications/resources/list_changed",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
            Self::ResourceTemplate => "resource template",
        })
    }
}

/// Behavioral hints for a tool.
///
/// Defaults are the conservative reading: the tool may write, may destroy,
/// is not idempotent and talks to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(rename = "readOnlyHint", default)]
    pub read_only: bool,
    #[serde(rename = "destructiveHint", default = "default_true")]
    pub destructive: bool,
    #[serde(rename = "idempotentHint", default)]
    pub idempotent: bool,
    #[serde(rename = "openWorldHint", default = "default_true")]
    pub open_world: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ToolAnnotations {
    fn default() -> Self {
        Self {
            read_only: false,
            destructive: true,
            idempotent: false,
            open_world: true,
        }
    }
}

impl ToolAnnotations {
    /// Hints for a tool that only observes state
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            destructive: false,
            idempotent: true,
            open_world: false,
        }
    }
}

/// Definition of a tool that can be called
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique name within a server instance
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// JSON Schema defining the tool's input parameters
    pub input_schema: Value,
    pub output_schema: Option<Value>,
    pub annotations: ToolAnnotations,
    /// Free-form metadata, sent as `_meta`
    pub meta: Option<Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: Some(description.into()),
            input_schema,
            output_schema: None,
            annotations: ToolAnnotations::default(),
            meta: None,
        }
    }

    /// Build a definition whose input schema is derived from `I`.
    pub fn from_schema<I: JsonSchema>(name: &str, description: &str) -> Self {
        Self::new(name, description, schema_for_type::<I>())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Render for `tools/list` under the negotiated protocol version
    pub fn to_wire(&self, version: &str) -> Value {
        let mut tool = Map::new();
        tool.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            tool.insert("description".into(), json!(description));
        }
        tool.insert("inputSchema".into(), self.input_schema.clone());
        if version_at_least(version, PROTOCOL_2025_03_26) {
            tool.insert("annotations".into(), json!(self.annotations));
        }
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(title) = &self.title {
                tool.insert("title".into(), json!(title));
            }
            if let Some(output_schema) = &self.output_schema {
                tool.insert("outputSchema".into(), output_schema.clone());
            }
            if let Some(meta) = &self.meta {
                tool.insert("_meta".into(), meta.clone());
            }
        }
        Value::Object(tool)
    }
}

/// An argument accepted by a prompt template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
        }
    }
}

/// Definition of a prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDefinition {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub arguments: Vec<PromptArgument>,
    pub meta: Option<Value>,
}

impl PromptDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: Some(description.into()),
            arguments: Vec::new(),
            meta: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Input schema equivalent to the declared arguments.
    ///
    /// Prompt arguments are always strings on the wire.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .arguments
            .iter()
            .map(|arg| (arg.name.clone(), json!({ "type": "string" })))
            .collect();
        let required: Vec<&str> = self
            .arguments
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_wire(&self, version: &str) -> Value {
        let mut prompt = Map::new();
        prompt.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            prompt.insert("description".into(), json!(description));
        }
        if !self.arguments.is_empty() {
            prompt.insert("arguments".into(), json!(self.arguments));
        }
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(title) = &self.title {
                prompt.insert("title".into(), json!(title));
            }
            if let Some(meta) = &self.meta {
                prompt.insert("_meta".into(), meta.clone());
            }
        }
        Value::Object(prompt)
    }
}

/// Definition of a concrete resource, addressed by URI
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub meta: Option<Value>,
}

impl ResourceDefinition {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            title: None,
            description: None,
            mime_type: None,
            meta: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn to_wire(&self, version: &str) -> Value {
        let mut resource = Map::new();
        resource.insert("uri".into(), json!(self.uri));
        resource.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            resource.insert("description".into(), json!(description));
        }
        if let Some(mime_type) = &self.mime_type {
            resource.insert("mimeType".into(), json!(mime_type));
        }
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(title) = &self.title {
                resource.insert("title".into(), json!(title));
            }
            if let Some(meta) = &self.meta {
                resource.insert("_meta".into(), meta.clone());
            }
        }
        Value::Object(resource)
    }
}

/// Definition of a family of resources described by a URI template
/// such as `file:///logs/{date}`
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTemplateDefinition {
    pub uri_template: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub meta: Option<Value>,
}

impl ResourceTemplateDefinition {
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            title: None,
            description: None,
            mime_type: None,
            meta: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn to_wire(&self, version: &str) -> Value {
        let mut template = Map::new();
        template.insert("uriTemplate".into(), json!(self.uri_template));
        template.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            template.insert("description".into(), json!(description));
        }
        if let Some(mime_type) = &self.mime_type {
            template.insert("mimeType".into(), json!(mime_type));
        }
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(title) = &self.title {
                template.insert("title".into(), json!(title));
            }
            if let Some(meta) = &self.meta {
                template.insert("_meta".into(), meta.clone());
            }
        }
        Value::Object(template)
    }
}

/// Generate a self-contained JSON schema for `T`.
///
/// Subschemas are inlined so the result never carries `$ref`, which the
/// registry refuses.
pub fn schema_for_type<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let mut schema = generator.into_root_schema_for::<T>().to_value();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PROTOCOL_2024_11_05;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Inner {
        depth: u32,
    }

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Nested {
        label: String,
        inner: Inner,
        note: Option<String>,
    }

    #[test]
    fn test_annotation_defaults_are_conservative() {
        let hints = ToolAnnotations::default();
        assert!(!hints.read_only);
        assert!(hints.destructive);
        assert!(!hints.idempotent);
        assert!(hints.open_world);

        let parsed: ToolAnnotations = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, hints);
    }

    #[test]
    fn test_tool_wire_is_version_gated() {
        let tool = ToolDefinition::new("echo", "Echo input", json!({"type": "object"}))
            .with_title("Echo")
            .with_output_schema(json!({"type": "object"}));

        let old = tool.to_wire(PROTOCOL_2024_11_05);
        assert!(old.get("title").is_none());
        assert!(old.get("annotations").is_none());
        assert!(old.get("outputSchema").is_none());

        let new = tool.to_wire(PROTOCOL_2025_06_18);
        assert_eq!(new["title"], "Echo");
        assert_eq!(new["annotations"]["destructiveHint"], true);
        assert_eq!(new["inputSchema"]["type"], "object");
    }

    #[test]
    fn test_generated_schema_has_no_refs() {
        let schema = schema_for_type::<Nested>();
        let text = serde_json::to_string(&schema).unwrap();

        assert!(!text.contains("$ref"));
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["inner"]["type"], "object");
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("label")));
        assert!(!required.contains(&json!("note")));
    }

    #[test]
    fn test_prompt_schema_from_arguments() {
        let prompt = PromptDefinition::new("review", "Review code")
            .with_argument(PromptArgument::required("code", "Source"))
            .with_argument(PromptArgument::optional("language", "Language"));

        let schema = prompt.input_schema();
        assert_eq!(schema["required"], json!(["code"]));
        assert_eq!(schema["properties"]["language"]["type"], "string");
    }
}
