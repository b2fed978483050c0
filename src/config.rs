//! Server configuration
//!
//! Built once before the server starts and shared read-only by the
//! dispatcher and every transport.

use {
    crate::{
        instrumentation::{InstrumentationEvent, InstrumentationHook},
        limits::ResourceLimits,
        protocol::{
            negotiate_version, version_at_least, DEFAULT_PROTOCOL_VERSION, PROTOCOL_2025_03_26,
            PROTOCOL_2025_06_18, PROTOCOL_2025_11_25,
        },
    },
    serde_json::{json, Map, Value},
    std::{panic::AssertUnwindSafe, sync::Arc},
    tracing::error,
};

/// Observer for handler failures. Receives the error and the server context.
pub type ExceptionReporter<C> = Arc<dyn Fn(&anyhow::Error, &C) + Send + Sync>;

/// Identity advertised in `serverInfo`
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub title: Option<String>,
    pub website_url: Option<String>,
    pub description: Option<String>,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            title: None,
            website_url: None,
            description: None,
        }
    }

    /// Render for the negotiated version, omitting fields it does not know
    pub fn to_wire(&self, version: &str) -> Value {
        let mut info = Map::new();
        info.insert("name".into(), json!(self.name));
        info.insert("version".into(), json!(self.version));
        if version_at_least(version, PROTOCOL_2025_06_18) {
            if let Some(title) = &self.title {
                info.insert("title".into(), json!(title));
            }
        }
        if version_at_least(version, PROTOCOL_2025_11_25) {
            if let Some(url) = &self.website_url {
                info.insert("websiteUrl".into(), json!(url));
            }
            if let Some(description) = &self.description {
                info.insert("description".into(), json!(description));
            }
        }
        Value::Object(info)
    }
}

pub struct ServerConfig<C> {
    pub info: ServerInfo,
    pub instructions: Option<String>,
    /// Highest protocol version this server will agree to
    pub protocol_version: String,
    pub validate_arguments: bool,
    pub exception_reporter: Option<ExceptionReporter<C>>,
    pub instrumentation: Option<InstrumentationHook>,
    pub limits: ResourceLimits,
}

impl<C> ServerConfig<C> {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo::new(name, version),
            instructions: None,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            validate_arguments: true,
            exception_reporter: None,
            instrumentation: None,
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.info.title = Some(title.into());
        self
    }

    pub fn with_website_url(mut self, url: impl Into<String>) -> Self {
        self.info.website_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_argument_validation(mut self, enabled: bool) -> Self {
        self.validate_arguments = enabled;
        self
    }

    pub fn with_exception_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&anyhow::Error, &C) + Send + Sync + 'static,
    {
        self.exception_reporter = Some(Arc::new(reporter));
        self
    }

    pub fn with_instrumentation<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InstrumentationEvent) + Send + Sync + 'static,
    {
        self.instrumentation = Some(Arc::new(hook));
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn negotiate(&self, requested: Option<&str>) -> String {
        negotiate_version(requested, &self.protocol_version)
    }

    /// `initialize` result body for the negotiated version
    pub fn initialize_result(&self, version: &str) -> Value {
        let mut result = json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": true },
                "prompts": { "listChanged": true },
                "resources": { "listChanged": true },
            },
            "serverInfo": self.info.to_wire(version),
        });
        if version_at_least(version, PROTOCOL_2025_03_26) {
            if let Some(instructions) = &self.instructions {
                result["instructions"] = json!(instructions);
            }
        }
        result
    }

    /// Hand a handler failure to the reporter. A panicking reporter is logged
    /// and otherwise ignored.
    pub fn report_exception(&self, err: &anyhow::Error, context: &C) {
        let Some(reporter) = &self.exception_reporter else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| reporter(err, context))).is_err() {
            error!(event = "reporter_panic", "Exception reporter panicked");
        }
    }
}

impl<C> Clone for ServerConfig<C> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            instructions: self.instructions.clone(),
            protocol_version: self.protocol_version.clone(),
            validate_arguments: self.validate_arguments,
            exception_reporter: self.exception_reporter.clone(),
            instrumentation: self.instrumentation.clone(),
            limits: self.limits.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ServerConfig<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("info", &self.info)
            .field("protocol_version", &self.protocol_version)
            .field("validate_arguments", &self.validate_arguments)
            .field("exception_reporter", &self.exception_reporter.is_some())
            .field("instrumentation", &self.instrumentation.is_some())
            .field("limits", &self.limits)
            .finish()
    }
}
