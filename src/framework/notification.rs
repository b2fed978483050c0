//! Notification handling for the MCP framework.
//!
//! Server-to-client notifications travel through a [`Notifier`], which forwards
//! them to whichever transport is attached. Handlers get a [`NotificationCtx`]
//! that wraps the notifier with the caller's session and progress token.

use {
    crate::{protocol::notification_envelope, types::CapabilityKind},
    anyhow::Result,
    serde::Serialize,
    serde_json::{json, Value},
    std::sync::{Arc, RwLock},
    tracing::debug,
};

/// Notification types that can be sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum McpNotification {
    /// Tools have changed
    ToolsListChanged,
    /// Resources or resource templates have changed
    ResourcesListChanged,
    /// Prompts have changed
    PromptsListChanged,
    /// Progress of a request that supplied a progress token
    Progress {
        progress_token: Value,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    },
    /// Log message
    LogMessage {
        level: LogLevel,
        logger: Option<String>,
        data: Value,
    },
    /// Custom notification
    Custom {
        method: String,
        params: Option<Value>,
    },
}

impl McpNotification {
    pub fn list_changed(kind: CapabilityKind) -> Self {
        match kind {
            CapabilityKind::Tool => Self::ToolsListChanged,
            CapabilityKind::Prompt => Self::PromptsListChanged,
            CapabilityKind::Resource | CapabilityKind::ResourceTemplate => {
                Self::ResourcesListChanged
            }
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Self::ToolsListChanged => CapabilityKind::Tool.list_changed_method(),
            Self::ResourcesListChanged => CapabilityKind::Resource.list_changed_method(),
            Self::PromptsListChanged => CapabilityKind::Prompt.list_changed_method(),
            Self::Progress { .. } => "notifications/progress",
            Self::LogMessage { .. } => "notifications/message",
            Self::Custom { method, .. } => method,
        }
    }

    /// JSON-RPC envelope with no `id`
    pub fn to_envelope(&self) -> Value {
        let params = match self {
            Self::ToolsListChanged | Self::ResourcesListChanged | Self::PromptsListChanged => None,
            Self::Progress {
                progress_token,
                progress,
                total,
                message,
            } => {
                let mut params = json!({ "progressToken": progress_token, "progress": progress });
                if let Some(total) = total {
                    params["total"] = json!(total);
                }
                if let Some(message) = message {
                    params["message"] = json!(message);
                }
                Some(params)
            }
            Self::LogMessage {
                level,
                logger,
                data,
            } => {
                let mut params = json!({ "level": level, "data": data });
                if let Some(logger) = logger {
                    params["logger"] = json!(logger);
                }
                Some(params)
            }
            Self::Custom { params, .. } => params.clone(),
        };
        notification_envelope(self.method(), params)
    }
}

/// Log levels for log message notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

/// Transport side of the notification channel.
///
/// `target` names a session; `None` broadcasts to every connected peer.
/// Delivery is best effort and must not block.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, target: Option<&str>, envelope: Value);
}

/// Routes notifications to the attached transport.
///
/// Cloning is cheap; all clones share the same attachment. Sending before any
/// transport is attached is a no-op that returns `false`.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Arc<RwLock<Option<Arc<dyn NotificationSink>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, sink: Arc<dyn NotificationSink>) {
        *self.sink.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sink);
    }

    pub fn detach(&self) {
        *self.sink.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Deliver one notification. Returns whether a transport took it.
    pub fn notify(&self, target: Option<&str>, notification: &McpNotification) -> bool {
        // Clone out so the sink runs without the lock held
        let sink = self
            .sink
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match sink {
            Some(sink) => {
                sink.deliver(target, notification.to_envelope());
                true
            }
            None => {
                debug!(
                    method = notification.method(),
                    "No transport attached, notification dropped"
                );
                false
            }
        }
    }

    /// Broadcast the list-changed notification for `kind`
    pub fn list_changed(&self, kind: CapabilityKind) -> bool {
        self.notify(None, &McpNotification::list_changed(kind))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Ergonomic notification context handed to every capability handler.
///
/// Log and progress notifications are addressed to the peer that made the
/// request; list-changed notifications go to every peer.
///
/// # Examples
///
/// ```rust
/// use relaymcp::framework::NotificationCtx;
/// use anyhow::Result;
///
/// async fn example_tool(ctx: NotificationCtx) -> Result<()> {
///     ctx.info("Processing started")?;
///     ctx.progress(50.0, Some(100.0))?;
///     ctx.resources_changed()?;
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct NotificationCtx {
    notifier: Notifier,
    session_id: Option<String>,
    progress_token: Option<Value>,
}

impl NotificationCtx {
    /// Usually built by the dispatcher; handlers receive it ready to use.
    pub fn new(notifier: Notifier, session_id: Option<String>, progress_token: Option<Value>) -> Self {
        Self {
            notifier,
            session_id,
            progress_token,
        }
    }

    /// A context that sends nothing, for calling handlers directly in tests
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Send an informational notification to the client.
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message, None::<Value>)
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message, None::<Value>)
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warning, message, None::<Value>)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message, None::<Value>)
    }

    /// Send a log notification with custom level and optional structured data.
    ///
    /// # Returns
    /// `Result<()>` - Err only if `data` fails to serialize
    ///
    /// # Examples
    /// ```rust,ignore
    /// ctx.log(LogLevel::Info, "Operation completed", Some(json!({
    ///     "duration": 1234,
    ///     "items_processed": 42
    /// })))?;
    /// ```
    pub fn log<T>(&self, level: LogLevel, message: impl Into<String>, data: Option<T>) -> Result<()>
    where
        T: Serialize,
    {
        let message = message.into();
        let data = match data {
            Some(data) => json!({ "message": message, "data": serde_json::to_value(data)? }),
            None => Value::String(message),
        };
        self.notifier.notify(
            self.session_id.as_deref(),
            &McpNotification::LogMessage {
                level,
                logger: Some("app".to_string()),
                data,
            },
        );
        Ok(())
    }

    /// Report progress on the current request.
    ///
    /// Does nothing when the caller did not supply a progress token.
    pub fn progress(&self, progress: f64, total: Option<f64>) -> Result<()> {
        self.progress_with_message(progress, total, None::<String>)
    }

    pub fn progress_with_message(
        &self,
        progress: f64,
        total: Option<f64>,
        message: Option<impl Into<String>>,
    ) -> Result<()> {
        if let Some(token) = &self.progress_token {
            self.notifier.notify(
                self.session_id.as_deref(),
                &McpNotification::Progress {
                    progress_token: token.clone(),
                    progress,
                    total,
                    message: message.map(Into::into),
                },
            );
        }
        Ok(())
    }

    /// Notify every client that the list of available resources has changed.
    pub fn resources_changed(&self) -> Result<()> {
        self.notifier.list_changed(CapabilityKind::Resource);
        Ok(())
    }

    /// Notify every client that the list of available tools has changed.
    pub fn tools_changed(&self) -> Result<()> {
        self.notifier.list_changed(CapabilityKind::Tool);
        Ok(())
    }

    /// Notify every client that the list of available prompts has changed.
    pub fn prompts_changed(&self) -> Result<()> {
        self.notifier.list_changed(CapabilityKind::Prompt);
        Ok(())
    }

    /// Send an arbitrary notification to the calling peer
    pub fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<()> {
        self.notifier.notify(
            self.session_id.as_deref(),
            &McpNotification::Custom {
                method: method.into(),
                params,
            },
        );
        Ok(())
    }
}
