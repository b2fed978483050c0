//! Test helpers for integration tests
//!
//! A small demo server plus helpers for driving its HTTP routes in process
//! (`warp::test`) or over a real socket (`reqwest`).

#![allow(dead_code)]

use relaymcp::{
    HttpMode, McpServer, McpServerBuilder, PromptArgument, PromptDefinition, PromptMessage,
    PromptResult, ResourceContents, ResourceTemplateDefinition, ToolResult,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};
use warp::{filters::BoxedFilter, http::Response, hyper::body::Bytes, reply};

pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Default)]
pub struct TestContext {
    pub echo_calls: AtomicU32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoInput {
    pub msg: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnnounceInput {
    pub text: String,
}

/// Demo server: `echo` (counts its calls), `announce` (logs to the caller),
/// a `greet` prompt and a `memo://{topic}` template.
pub fn test_server() -> McpServer<TestContext> {
    McpServerBuilder::new(TestContext::default(), "test-server", "1.0.0")
        .with_tool("echo", "Echo a message", |input: EchoInput, ctx: Arc<TestContext>, _notif| async move {
            ctx.echo_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::text(input.msg))
        })
        .with_tool("announce", "Log to the caller", |input: AnnounceInput, _ctx, notif| async move {
            notif.info(input.text)?;
            Ok(ToolResult::text("announced"))
        })
        .with_prompt(
            PromptDefinition::new("greet", "Greeting").with_argument(PromptArgument::required("name", "Who")),
            |args, _ctx, _notif| async move {
                let name = args["name"].as_str().unwrap_or_default().to_string();
                Ok(PromptResult::new(vec![PromptMessage::user(format!("Hello {name}"))]))
            },
        )
        .with_resource_template(
            ResourceTemplateDefinition::new("memo://{topic}", "memo"),
            |uri, vars, _ctx, _notif| async move {
                let topic = vars.get("topic").cloned().unwrap_or_default();
                Ok(vec![ResourceContents::text(uri, format!("Notes about {topic}"))])
            },
        )
        .build()
        .expect("test server builds")
}

pub fn routes(server: &McpServer<TestContext>, mode: HttpMode) -> BoxedFilter<(reply::Response,)> {
    server.http_transport(mode).routes()
}

pub fn initialize_request(version: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }
    })
}

pub fn call_tool(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// POST a JSON body to `/mcp` in process
pub async fn post(
    filter: &BoxedFilter<(reply::Response,)>,
    body: &Value,
    session: Option<&str>,
) -> Response<Bytes> {
    let mut request = warp::test::request()
        .method("POST")
        .path("/mcp")
        .header("content-type", "application/json")
        .body(body.to_string());
    if let Some(session) = session {
        request = request.header(SESSION_HEADER, session);
    }
    request.reply(filter).await
}

pub fn body_json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("response body is JSON")
}

pub fn session_id(response: &Response<Bytes>) -> String {
    response
        .headers()
        .get(SESSION_HEADER)
        .expect("session header present")
        .to_str()
        .unwrap()
        .to_string()
}

/// Initialize a stateful session in process and return its id
pub async fn open_session(filter: &BoxedFilter<(reply::Response,)>) -> String {
    let response = post(filter, &initialize_request("2025-06-18"), None).await;
    assert_eq!(response.status(), 200);
    session_id(&response)
}

/// A server listening on an OS-assigned port
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(server: McpServer<TestContext>, mode: HttpMode) -> Self {
        let (addr, handle) = server
            .start_dynamic(mode)
            .await
            .expect("Failed to start server on dynamic port");

        // Wait until /health answers
        let client = reqwest::Client::new();
        for _ in 0..20 {
            match client.get(format!("http://{addr}/health")).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => break,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
        Self { addr, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
