//! Method dispatcher
//!
//! Routes one decoded envelope to a custom method or a protocol built-in,
//! runs capability handlers behind validation, and turns every outcome into
//! at most one response envelope. Handler failures (errors and panics) are
//! caught here, reported, and answered with a generic error.

use {
    crate::{
        config::ServerConfig,
        content_types::{PromptResult, ToolResult},
        error::{InputRejected, McpError, McpResult},
        framework::{
            handler::MethodHandler,
            notification::{NotificationCtx, Notifier},
            registry::{CapabilityRegistry, ResourceTarget},
        },
        instrumentation::{self, InstrumentationEvent},
        logging::{log_parse_error, log_unknown_method, request_span},
        peer::PeerState,
        protocol::{
            message::parse_frame, success_response, Incoming, InitializeParams, PromptGetParams,
            Request, ResourceReadParams, ToolCallParams,
        },
        validation::SchemaValidator,
    },
    futures_util::FutureExt,
    serde_json::{json, Map, Value},
    std::{
        any::Any,
        collections::HashMap,
        future::Future,
        panic::AssertUnwindSafe,
        sync::{Arc, RwLock},
        time::Instant,
    },
    tracing::{debug, info, warn, Instrument},
};

const BUILTIN_METHODS: &[&str] = &[
    "initialize",
    "ping",
    "tools/list",
    "tools/call",
    "prompts/list",
    "prompts/get",
    "resources/list",
    "resources/read",
    "resources/templates/list",
    "notifications/initialized",
    "notifications/cancelled",
    "notifications/tools/list_changed",
    "notifications/prompts/list_changed",
    "notifications/resources/list_changed",
];

fn is_notification_method(method: &str) -> bool {
    method.starts_with("notifications/")
}

/// Outcome of routing one request: the capability it touched, if any, and
/// the result or error. `Ok(None)` means the method produces no result.
struct Routed {
    capability: Option<String>,
    outcome: McpResult<Option<Value>>,
}

impl Routed {
    fn plain(outcome: McpResult<Option<Value>>) -> Self {
        Self {
            capability: None,
            outcome,
        }
    }
}

pub struct McpDispatcher<C> {
    context: Arc<C>,
    config: Arc<ServerConfig<C>>,
    registry: Arc<CapabilityRegistry<C>>,
    methods: RwLock<HashMap<String, MethodHandler<C>>>,
}

impl<C: Send + Sync + 'static> McpDispatcher<C> {
    pub fn new(context: Arc<C>, config: Arc<ServerConfig<C>>, registry: Arc<CapabilityRegistry<C>>) -> Self {
        Self {
            context,
            config,
            registry,
            methods: RwLock::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn config(&self) -> &Arc<ServerConfig<C>> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry<C>> {
        &self.registry
    }

    pub fn notifier(&self) -> &Notifier {
        self.registry.notifier()
    }

    /// Define a custom method, or override a built-in.
    ///
    /// The handler shape must fit the name: `notifications/*` methods take a
    /// notification handler, everything else a request handler. A name can
    /// only be defined once.
    pub fn define_method(&self, name: &str, handler: MethodHandler<C>) -> McpResult<()> {
        let wants_notification = is_notification_method(name);
        let is_notification = matches!(handler, MethodHandler::Notification(_));
        if wants_notification != is_notification {
            return Err(McpError::MethodShapeMismatch {
                method: name.to_string(),
                shape: handler.shape(),
            });
        }

        let mut methods = self
            .methods
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if methods.contains_key(name) {
            return Err(McpError::MethodAlreadyDefined(name.to_string()));
        }
        if BUILTIN_METHODS.contains(&name) {
            info!(method = %name, "Overriding built-in method");
        }
        methods.insert(name.to_string(), handler);
        Ok(())
    }

    /// Decode a raw frame and dispatch it
    pub async fn dispatch_bytes(&self, bytes: &[u8], peer: &PeerState) -> Option<Value> {
        match parse_frame(bytes) {
            Ok(message) => self.dispatch(message, peer).await,
            Err(error) => {
                log_parse_error(&error.to_string(), &String::from_utf8_lossy(bytes));
                self.instrument(String::new(), None, None, peer, Instant::now(), Some(&error));
                Some(error.to_json_rpc_error(None))
            }
        }
    }

    /// Dispatch one decoded message.
    ///
    /// Returns the response envelope, or `None` for notifications and for
    /// replies from the peer. Never panics because of a handler.
    pub async fn dispatch(&self, message: Value, peer: &PeerState) -> Option<Value> {
        let started = Instant::now();
        let request = match Incoming::from_value(&message) {
            Ok(Incoming::Request(request)) => request,
            Ok(Incoming::Response { id }) => {
                debug!(id = %id, "Ignoring response from peer");
                return None;
            }
            Err(invalid) => {
                warn!(error = %invalid.error, "Rejected malformed envelope");
                self.instrument(
                    invalid.method.clone().unwrap_or_default(),
                    None,
                    invalid.id.clone(),
                    peer,
                    started,
                    Some(&invalid.error),
                );
                if invalid.notification {
                    return None;
                }
                return Some(invalid.to_json_rpc_error());
            }
        };

        let request_id = request.id.as_ref().map(Value::to_string).unwrap_or_default();
        let span = request_span(&request.method, &request_id, peer.session_id());
        let routed = self.route(&request, peer).instrument(span).await;

        self.instrument(
            request.method.clone(),
            routed.capability,
            request.id.clone(),
            peer,
            started,
            routed.outcome.as_ref().err(),
        );

        let id = request.id?;
        Some(match routed.outcome {
            Ok(result) => success_response(id, result.unwrap_or_else(|| json!({}))),
            Err(error) => error.to_json_rpc_error(Some(id)),
        })
    }

    fn instrument(
        &self,
        method: String,
        capability: Option<String>,
        request_id: Option<Value>,
        peer: &PeerState,
        started: Instant,
        error: Option<&McpError>,
    ) {
        let event = InstrumentationEvent {
            method,
            capability,
            request_id,
            session_id: peer.session_id().map(str::to_string),
            duration: started.elapsed(),
            error_kind: error.map(McpError::kind),
        };
        debug!(
            method = %event.method,
            duration_ms = event.duration_ms() as u64,
            error_kind = event.error_kind.map(|kind| kind.as_str()),
            event = "dispatch_complete",
            "Dispatched"
        );
        instrumentation::emit(self.config.instrumentation.as_ref(), &event);
    }

    async fn route(&self, request: &Request, peer: &PeerState) -> Routed {
        let custom = self
            .methods
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&request.method)
            .cloned();
        if let Some(handler) = custom {
            return Routed::plain(self.run_custom(handler, request, peer).await);
        }

        if is_notification_method(&request.method) && !request.is_notification() {
            return Routed::plain(Err(McpError::InvalidRequest(format!(
                "{} is a notification and must not carry an id",
                request.method
            ))));
        }

        match request.method.as_str() {
            "initialize" => Routed::plain(self.initialize(request, peer)),
            "ping" => Routed::plain(Ok(Some(json!({})))),
            "tools/list" => Routed::plain(Ok(Some(self.tools_list(peer)))),
            "tools/call" => self.tools_call(request, peer).await,
            "prompts/list" => Routed::plain(Ok(Some(self.prompts_list(peer)))),
            "prompts/get" => self.prompts_get(request, peer).await,
            "resources/list" => Routed::plain(Ok(Some(self.resources_list(peer)))),
            "resources/templates/list" => Routed::plain(Ok(Some(self.templates_list(peer)))),
            "resources/read" => self.resources_read(request, peer).await,
            "notifications/initialized" => {
                peer.mark_initialized();
                debug!(session_id = ?peer.session_id(), "Peer initialized");
                Routed::plain(Ok(None))
            }
            "notifications/cancelled" => {
                let cancelled = request.params.as_ref().and_then(|p| p.get("requestId"));
                info!(request_id = ?cancelled, "Peer cancelled request");
                Routed::plain(Ok(None))
            }
            "notifications/tools/list_changed"
            | "notifications/prompts/list_changed"
            | "notifications/resources/list_changed" => Routed::plain(Ok(None)),
            method => {
                log_unknown_method(method);
                Routed::plain(Err(McpError::UnknownMethod(method.to_string())))
            }
        }
    }

    async fn run_custom(
        &self,
        handler: MethodHandler<C>,
        request: &Request,
        peer: &PeerState,
    ) -> McpResult<Option<Value>> {
        let params = request
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let notif = self.notification_ctx(request, peer);
        match handler {
            MethodHandler::Request(handler) => {
                let value = self
                    .guarded(handler(params, self.context.clone(), notif))
                    .await?;
                Ok(Some(value))
            }
            MethodHandler::Notification(_) if !request.is_notification() => {
                Err(McpError::InvalidRequest(format!(
                    "{} is a notification and must not carry an id",
                    request.method
                )))
            }
            MethodHandler::Notification(handler) => {
                self.guarded(handler(params, self.context.clone(), notif))
                    .await?;
                Ok(None)
            }
        }
    }

    fn negotiated_version(&self, peer: &PeerState) -> String {
        peer.protocol_version()
            .unwrap_or_else(|| self.config.protocol_version.clone())
    }

    fn notification_ctx(&self, request: &Request, peer: &PeerState) -> NotificationCtx {
        NotificationCtx::new(
            self.notifier().clone(),
            peer.session_id().map(str::to_string),
            request.progress_token(),
        )
    }

    /// Await a handler future, catching errors and panics.
    ///
    /// Rejected typed input keeps its invalid-arguments class. Any other
    /// error, whatever its type, is reported and replaced by a generic
    /// handler error.
    async fn guarded<T, F>(&self, future: F) -> McpResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let failure = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => match err.downcast::<InputRejected>() {
                Ok(InputRejected(issues)) => return Err(McpError::InvalidArguments(issues)),
                Err(err) => err,
            },
            Err(panic) => anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
        };
        warn!(error = %failure, event = "handler_error", "Handler failed");
        self.config.report_exception(&failure, &self.context);
        Err(McpError::Handler)
    }

    fn initialize(&self, request: &Request, peer: &PeerState) -> McpResult<Option<Value>> {
        let params: InitializeParams = request.parse_params()?;
        let version = self.config.negotiate(params.protocol_version.as_deref());
        info!(
            requested = ?params.protocol_version,
            negotiated = %version,
            session_id = ?peer.session_id(),
            "Client initializing"
        );
        let result = self.config.initialize_result(&version);
        peer.set_negotiated(version, params.client_info);
        Ok(Some(result))
    }

    fn tools_list(&self, peer: &PeerState) -> Value {
        let version = self.negotiated_version(peer);
        let tools: Vec<Value> = self
            .registry
            .list_tools()
            .iter()
            .map(|tool| tool.to_wire(&version))
            .collect();
        json!({ "tools": tools })
    }

    async fn tools_call(&self, request: &Request, peer: &PeerState) -> Routed {
        let params: ToolCallParams = match request.parse_params() {
            Ok(params) => params,
            Err(error) => return Routed::plain(Err(error)),
        };
        let capability = Some(params.name.clone());
        let outcome = self.call_tool(params, request, peer).await;
        Routed {
            capability,
            outcome,
        }
    }

    async fn call_tool(
        &self,
        params: ToolCallParams,
        request: &Request,
        peer: &PeerState,
    ) -> McpResult<Option<Value>> {
        let entry = self.registry.tool(&params.name)?;
        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Map::new()));
        if self.config.validate_arguments {
            SchemaValidator::validate(&arguments, &entry.definition.input_schema)
                .map_err(McpError::InvalidArguments)?;
        }
        let notif = self.notification_ctx(request, peer);
        let result: ToolResult = self
            .guarded((entry.handler)(arguments, self.context.clone(), notif))
            .await?;
        Ok(Some(result.to_wire(&self.negotiated_version(peer))))
    }

    fn prompts_list(&self, peer: &PeerState) -> Value {
        let version = self.negotiated_version(peer);
        let prompts: Vec<Value> = self
            .registry
            .list_prompts()
            .iter()
            .map(|prompt| prompt.to_wire(&version))
            .collect();
        json!({ "prompts": prompts })
    }

    async fn prompts_get(&self, request: &Request, peer: &PeerState) -> Routed {
        let params: PromptGetParams = match request.parse_params() {
            Ok(params) => params,
            Err(error) => return Routed::plain(Err(error)),
        };
        let capability = Some(params.name.clone());
        let outcome = self.get_prompt(params, request, peer).await;
        Routed {
            capability,
            outcome,
        }
    }

    async fn get_prompt(
        &self,
        params: PromptGetParams,
        request: &Request,
        peer: &PeerState,
    ) -> McpResult<Option<Value>> {
        let entry = self.registry.prompt(&params.name)?;
        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Map::new()));
        if self.config.validate_arguments {
            SchemaValidator::validate(&arguments, &entry.input_schema)
                .map_err(McpError::InvalidArguments)?;
        }
        let notif = self.notification_ctx(request, peer);
        let result: PromptResult = self
            .guarded((entry.handler)(arguments, self.context.clone(), notif))
            .await?;
        let rendered =
            serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))?;
        Ok(Some(rendered))
    }

    fn resources_list(&self, peer: &PeerState) -> Value {
        let version = self.negotiated_version(peer);
        let resources: Vec<Value> = self
            .registry
            .list_resources()
            .iter()
            .map(|resource| resource.to_wire(&version))
            .collect();
        json!({ "resources": resources })
    }

    fn templates_list(&self, peer: &PeerState) -> Value {
        let version = self.negotiated_version(peer);
        let templates: Vec<Value> = self
            .registry
            .list_resource_templates()
            .iter()
            .map(|template| template.to_wire(&version))
            .collect();
        json!({ "resourceTemplates": templates })
    }

    async fn resources_read(&self, request: &Request, peer: &PeerState) -> Routed {
        let params: ResourceReadParams = match request.parse_params() {
            Ok(params) => params,
            Err(error) => return Routed::plain(Err(error)),
        };
        let capability = Some(params.uri.clone());
        let outcome = self.read_resource(params.uri, request, peer).await;
        Routed {
            capability,
            outcome,
        }
    }

    async fn read_resource(
        &self,
        uri: String,
        request: &Request,
        peer: &PeerState,
    ) -> McpResult<Option<Value>> {
        let notif = self.notification_ctx(request, peer);
        let contents = match self.registry.resolve_resource(&uri)? {
            ResourceTarget::Resource(entry) => {
                self.guarded((entry.handler)(uri, self.context.clone(), notif))
                    .await?
            }
            ResourceTarget::Template(entry, values) => {
                self.guarded((entry.handler)(uri, values, self.context.clone(), notif))
                    .await?
            }
        };
        Ok(Some(json!({ "contents": contents })))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
