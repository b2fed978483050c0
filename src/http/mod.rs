//! HTTP transport
//!
//! JSON-RPC over `POST /mcp`, with an optional per-session event stream on
//! `GET /mcp`. Each request is dispatched on its own task, so a slow handler
//! only holds up the connection it arrived on.
//!
//! In [`HttpMode::Stateful`] the `initialize` request creates a session whose
//! id is returned in the `Mcp-Session-Id` header and must accompany every
//! later request. In [`HttpMode::Stateless`] every request stands alone and
//! notifications have nowhere to go.

pub mod response;
pub mod session;
pub mod validation;

pub use session::{Session, SessionTable};

use {
    self::{
        response::{
            apply_cors_headers, empty_response, error_response, json_response, with_session_header,
        },
        validation::{session_id_from_header, validate_body_size, validate_content_type},
    },
    crate::{
        dispatcher::McpDispatcher,
        error::McpError,
        health::HealthChecker,
        peer::PeerState,
        protocol::message::parse_frame,
    },
    futures_util::StreamExt,
    serde_json::Value,
    std::{convert::Infallible, sync::Arc},
    tokio::task::JoinHandle,
    tokio_stream::wrappers::UnboundedReceiverStream,
    tracing::{debug, info},
    warp::{
        filters::BoxedFilter,
        http::StatusCode,
        hyper::body::Bytes,
        reply::Response,
        sse::Event,
        Filter, Rejection, Reply,
    },
};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMode {
    /// `initialize` creates a session; later requests must name it
    Stateful,
    /// No sessions; notifications are dropped
    Stateless,
}

pub struct HttpTransport<C> {
    dispatcher: Arc<McpDispatcher<C>>,
    sessions: Arc<SessionTable>,
    mode: HttpMode,
    health: Arc<HealthChecker>,
}

impl<C> Clone for HttpTransport<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            sessions: self.sessions.clone(),
            mode: self.mode,
            health: self.health.clone(),
        }
    }
}

fn mcp_path() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path("mcp").and(warp::path::end())
}

fn session_header() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(SESSION_HEADER)
}

impl<C: Send + Sync + 'static> HttpTransport<C> {
    /// Build the transport. In stateful mode the session table becomes the
    /// dispatcher's notification sink.
    pub fn new(dispatcher: Arc<McpDispatcher<C>>, mode: HttpMode) -> Self {
        let config = dispatcher.config();
        let sessions = Arc::new(SessionTable::new(config.limits.clone()));
        let health = Arc::new(HealthChecker::new(
            config.info.name.clone(),
            config.info.version.clone(),
            config.protocol_version.clone(),
        ));
        if mode == HttpMode::Stateful {
            dispatcher.notifier().attach(sessions.clone());
        }
        Self {
            dispatcher,
            sessions,
            mode,
            health,
        }
    }

    pub fn mode(&self) -> HttpMode {
        self.mode
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// Start expiring idle sessions, if the limits ask for it
    pub fn spawn_reaper(&self) -> Option<JoinHandle<()>> {
        if self.mode == HttpMode::Stateless {
            return None;
        }
        let timeout = self.dispatcher.config().limits.session_idle_timeout?;
        Some(self.sessions.spawn_reaper(timeout))
    }

    /// All routes: `POST`/`GET`/`DELETE`/`OPTIONS /mcp` and `GET /health`
    pub fn routes(&self) -> BoxedFilter<(Response,)> {
        let transport = self.clone();
        let with_transport = warp::any().map(move || transport.clone());

        let post = mcp_path()
            .and(warp::post())
            .and(warp::header::optional::<String>("content-type"))
            .and(session_header())
            .and(warp::header::optional::<String>(PROTOCOL_VERSION_HEADER))
            .and(warp::body::bytes())
            .and(with_transport.clone())
            .then(
                |content_type: Option<String>,
                 session_id: Option<String>,
                 version: Option<String>,
                 body: Bytes,
                 transport: Self| async move {
                    transport
                        .handle_post(content_type, session_id, version, body)
                        .await
                },
            );

        let stream = mcp_path()
            .and(warp::get())
            .and(session_header())
            .and(with_transport.clone())
            .map(|session_id: Option<String>, transport: Self| transport.handle_stream(session_id));

        let delete = mcp_path()
            .and(warp::delete())
            .and(session_header())
            .and(with_transport.clone())
            .map(|session_id: Option<String>, transport: Self| transport.handle_delete(session_id));

        let preflight = mcp_path()
            .and(warp::options())
            .map(|| empty_response(StatusCode::NO_CONTENT));

        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_transport)
            .map(|transport: Self| {
                let sessions = match transport.mode {
                    HttpMode::Stateful => Some(transport.sessions.len()),
                    HttpMode::Stateless => None,
                };
                json_response(&transport.health.get_json_status(sessions), StatusCode::OK)
            });

        post.or(stream)
            .unify()
            .or(delete)
            .unify()
            .or(preflight)
            .unify()
            .or(health)
            .unify()
            .map(apply_cors_headers)
            .boxed()
    }

    async fn handle_post(
        &self,
        content_type: Option<String>,
        session_id: Option<String>,
        version: Option<String>,
        body: Bytes,
    ) -> Response {
        let config = self.dispatcher.config();
        if let Err(error) = validate_content_type(content_type.as_deref()) {
            return json_response(&error.to_json_rpc_error(None), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        }
        if let Err(error) = validate_body_size(body.len(), &config.limits) {
            return error_response(&error, None);
        }

        let message = match parse_frame(&body) {
            Ok(message) => message,
            Err(_) => {
                // Let the dispatcher build and instrument the parse error
                let peer = PeerState::new(None);
                return match self.dispatcher.dispatch_bytes(&body, &peer).await {
                    Some(envelope) => json_response(&envelope, StatusCode::BAD_REQUEST),
                    None => empty_response(StatusCode::BAD_REQUEST),
                };
            }
        };
        let request_id = message.get("id").cloned();
        let is_initialize = message.get("method").and_then(Value::as_str) == Some("initialize");

        match self.mode {
            HttpMode::Stateless => {
                let peer = if is_initialize {
                    PeerState::new(None)
                } else {
                    PeerState::with_protocol_version(None, config.negotiate(version.as_deref()))
                };
                reply_for(self.dispatcher.dispatch(message, &peer).await)
            }
            HttpMode::Stateful if is_initialize => self.initialize_session(message, request_id).await,
            HttpMode::Stateful => {
                let Some(session_id) = session_id_from_header(session_id.as_deref()) else {
                    return error_response(&McpError::MissingSession, request_id);
                };
                let session = match self.sessions.get(session_id) {
                    Ok(session) => session,
                    Err(error) => return error_response(&error, request_id),
                };
                let reply = reply_for(self.dispatcher.dispatch(message, session.peer()).await);
                with_session_header(reply, session.id())
            }
        }
    }

    async fn initialize_session(&self, message: Value, request_id: Option<Value>) -> Response {
        let session = match self.sessions.create() {
            Ok(session) => session,
            Err(error) => return error_response(&error, request_id),
        };
        let response = self.dispatcher.dispatch(message, session.peer()).await;
        let succeeded = response
            .as_ref()
            .is_some_and(|envelope| envelope.get("error").is_none());
        if !succeeded {
            debug!(session_id = %session.id(), "Initialize failed, discarding session");
            self.sessions.remove(session.id());
            return reply_for(response);
        }
        info!(session_id = %session.id(), "Session initialized");
        with_session_header(reply_for(response), session.id())
    }

    fn handle_stream(&self, session_id: Option<String>) -> Response {
        if self.mode == HttpMode::Stateless {
            return empty_response(StatusCode::METHOD_NOT_ALLOWED);
        }
        let Some(session_id) = session_id_from_header(session_id.as_deref()) else {
            return error_response(&McpError::MissingSession, None);
        };
        let receiver = match self
            .sessions
            .get(session_id)
            .and_then(|session| session.open_stream())
        {
            Ok(receiver) => receiver,
            Err(error) => return error_response(&error, None),
        };
        debug!(session_id = %session_id, "Event stream opened");

        let events = UnboundedReceiverStream::new(receiver).map(|envelope| {
            Ok::<_, Infallible>(Event::default().event("message").data(envelope.to_string()))
        });
        let reply = warp::sse::reply(warp::sse::keep_alive().stream(events)).into_response();
        with_session_header(reply, session_id)
    }

    fn handle_delete(&self, session_id: Option<String>) -> Response {
        if self.mode == HttpMode::Stateless {
            return empty_response(StatusCode::METHOD_NOT_ALLOWED);
        }
        let Some(session_id) = session_id_from_header(session_id.as_deref()) else {
            return error_response(&McpError::MissingSession, None);
        };
        if self.sessions.remove(session_id) {
            empty_response(StatusCode::NO_CONTENT)
        } else {
            error_response(&McpError::UnknownSession(session_id.to_string()), None)
        }
    }
}

/// Requests get their envelope back; notifications are acknowledged with 202.
fn reply_for(response: Option<Value>) -> Response {
    match response {
        Some(envelope) => json_response(&envelope, StatusCode::OK),
        None => empty_response(StatusCode::ACCEPTED),
    }
}
