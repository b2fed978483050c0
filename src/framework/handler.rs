//! Handler signatures for capabilities and custom methods.
//!
//! Handlers are plain async callables supplied by the embedding application.
//! Each receives its validated input, the shared application context `C` and a
//! [`NotificationCtx`], and reports failure through `anyhow::Result`.

use {
    super::notification::NotificationCtx,
    crate::content_types::{PromptResult, ResourceContents, ToolResult},
    serde_json::Value,
    std::{collections::HashMap, future::Future, pin::Pin, sync::Arc},
};

/// Boxed future returned by every handler
pub type HandlerFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// A tool function that can be called by the MCP client.
///
/// Receives the argument map after schema validation.
pub type ToolHandler<C> =
    Arc<dyn Fn(Value, Arc<C>, NotificationCtx) -> HandlerFuture<ToolResult> + Send + Sync>;

/// Renders a prompt from its (validated) string arguments
pub type PromptHandler<C> =
    Arc<dyn Fn(Value, Arc<C>, NotificationCtx) -> HandlerFuture<PromptResult> + Send + Sync>;

/// Reads a concrete resource; receives the requested URI
pub type ResourceHandler<C> = Arc<
    dyn Fn(String, Arc<C>, NotificationCtx) -> HandlerFuture<Vec<ResourceContents>> + Send + Sync,
>;

/// Reads a resource matched by a URI template; receives the URI and the
/// values extracted for each placeholder
pub type TemplateHandler<C> = Arc<
    dyn Fn(String, HashMap<String, String>, Arc<C>, NotificationCtx) -> HandlerFuture<Vec<ResourceContents>>
        + Send
        + Sync,
>;

/// Handler for a custom or overridden JSON-RPC method.
///
/// The shape is fixed at registration: request handlers produce a result,
/// notification handlers produce nothing.
pub enum MethodHandler<C> {
    Request(Arc<dyn Fn(Value, Arc<C>, NotificationCtx) -> HandlerFuture<Value> + Send + Sync>),
    Notification(Arc<dyn Fn(Value, Arc<C>, NotificationCtx) -> HandlerFuture<()> + Send + Sync>),
}

impl<C> MethodHandler<C> {
    pub fn request<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Request(Arc::new(move |params, context, notif| {
            Box::pin(handler(params, context, notif))
        }))
    }

    pub fn notification<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Notification(Arc::new(move |params, context, notif| {
            Box::pin(handler(params, context, notif))
        }))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Notification(_) => "notification",
        }
    }
}

impl<C> Clone for MethodHandler<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Request(handler) => Self::Request(handler.clone()),
            Self::Notification(handler) => Self::Notification(handler.clone()),
        }
    }
}

/// Box an async closure as a [`ToolHandler`]
pub fn tool_handler<C, F, Fut>(handler: F) -> ToolHandler<C>
where
    F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    Arc::new(move |args, context, notif| Box::pin(handler(args, context, notif)))
}

pub fn prompt_handler<C, F, Fut>(handler: F) -> PromptHandler<C>
where
    F: Fn(Value, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<PromptResult>> + Send + 'static,
{
    Arc::new(move |args, context, notif| Box::pin(handler(args, context, notif)))
}

pub fn resource_handler<C, F, Fut>(handler: F) -> ResourceHandler<C>
where
    F: Fn(String, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<ResourceContents>>> + Send + 'static,
{
    Arc::new(move |uri, context, notif| Box::pin(handler(uri, context, notif)))
}

pub fn template_handler<C, F, Fut>(handler: F) -> TemplateHandler<C>
where
    F: Fn(String, HashMap<String, String>, Arc<C>, NotificationCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<ResourceContents>>> + Send + 'static,
{
    Arc::new(move |uri, vars, context, notif| Box::pin(handler(uri, vars, context, notif)))
}
