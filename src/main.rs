//! MCP Server Example
//!
//! Demo server with an echo tool, a greeting prompt, and a templated memo
//! resource, served over stdio or HTTP.

use {
    anyhow::Result,
    clap::{Parser, ValueEnum},
    relaymcp::{
        logging, HttpMode, McpServerBuilder, PromptArgument, PromptDefinition, PromptMessage,
        PromptResult, ResourceContents, ResourceTemplateDefinition, ToolResult,
    },
    schemars::JsonSchema,
    serde::Deserialize,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "relaymcp-server", version, about = "Demo MCP server")]
struct Args {
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value = "stdio")]
    transport: Transport,

    #[arg(long, env = "MCP_PORT", default_value_t = 3000)]
    port: u16,

    /// Serve HTTP without sessions
    #[arg(long, env = "MCP_STATELESS", default_value_t = false)]
    stateless: bool,
}

#[derive(JsonSchema, Deserialize)]
struct EchoInput {
    msg: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing();

    let server = McpServerBuilder::new((), "relaymcp-demo", env!("CARGO_PKG_VERSION"))
        .with_instructions("Call `echo` to get your message back.")
        .with_tool("echo", "Echo a message", |input: EchoInput, _ctx, _notif| async move {
            Ok(ToolResult::text(input.msg))
        })
        .with_prompt(
            PromptDefinition::new("greet", "Greet someone by name")
                .with_argument(PromptArgument::required("name", "Who to greet")),
            |args, _ctx, _notif| async move {
                let name = args["name"].as_str().unwrap_or("friend").to_string();
                Ok(PromptResult::new(vec![PromptMessage::user(format!("Please greet {name}."))]))
            },
        )
        .with_resource_template(
            ResourceTemplateDefinition::new("memo://{topic}", "memo").with_mime_type("text/plain"),
            |uri, vars, _ctx, _notif| async move {
                let topic = vars.get("topic").cloned().unwrap_or_default();
                Ok(vec![ResourceContents::text(uri, format!("Notes about {topic}"))])
            },
        )
        .build()?;

    match args.transport {
        Transport::Stdio => {
            server.serve_stdio().await?;
            // Tokio's stdin reader blocks a worker thread until the next line
            std::process::exit(0);
        }
        Transport::Http => {
            let mode = if args.stateless {
                HttpMode::Stateless
            } else {
                HttpMode::Stateful
            };
            server.start(args.port, mode).await
        }
    }
}
