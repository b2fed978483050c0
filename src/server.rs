//! MCP Server
//!
//! Owns the dispatcher and hands it to whichever transport is started.

use {
    crate::{
        config::ServerConfig,
        dispatcher::McpDispatcher,
        framework::registry::CapabilityRegistry,
        http::{HttpMode, HttpTransport},
        logging::{log_server_ready, log_server_shutdown, log_server_startup},
        stdio::{stdio, StdioTransport},
    },
    anyhow::{Context, Result},
    std::{net::SocketAddr, sync::Arc},
    tokio::{
        io::{AsyncBufRead, AsyncWrite},
        net::TcpListener,
        task::JoinHandle,
    },
    tokio_stream::wrappers::TcpListenerStream,
    tracing::info,
};

pub struct McpServer<C> {
    dispatcher: Arc<McpDispatcher<C>>,
}

impl<C> Clone for McpServer<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> McpServer<C> {
    pub fn new(dispatcher: Arc<McpDispatcher<C>>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<McpDispatcher<C>> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry<C>> {
        self.dispatcher.registry()
    }

    pub fn config(&self) -> &Arc<ServerConfig<C>> {
        self.dispatcher.config()
    }

    /// Serve a single peer over stdin/stdout until input ends.
    ///
    /// Use [`StdioTransport::close_handle`] with [`McpServer::serve_stdio_with`]
    /// when the loop must be stopped from elsewhere.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve_stdio_with(stdio()).await
    }

    pub async fn serve_stdio_with<R, W>(&self, transport: StdioTransport<R, W>) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        info!(server = %self.config().info.name, "Serving MCP over stdio");
        transport.serve(self.dispatcher.clone()).await?;
        log_server_shutdown();
        Ok(())
    }

    pub fn http_transport(&self, mode: HttpMode) -> HttpTransport<C> {
        HttpTransport::new(self.dispatcher.clone(), mode)
    }

    /// Listen on `127.0.0.1:port` until the process exits.
    pub async fn start(&self, port: u16, mode: HttpMode) -> Result<()> {
        log_server_startup(port);
        let addr = format!("127.0.0.1:{port}")
            .parse::<SocketAddr>()
            .context("Invalid address")?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Could not bind to {}: {}", addr, e))?;

        let transport = self.http_transport(mode);
        let _reaper = transport.spawn_reaper();
        log_server_ready(&format!("http://{addr}/mcp"));
        info!(
            mode = ?mode,
            endpoints = ?vec!["POST /mcp", "GET /mcp (event stream)", "DELETE /mcp", "GET /health"],
            "Available endpoints"
        );

        warp::serve(transport.routes())
            .run_incoming(TcpListenerStream::new(listener))
            .await;
        log_server_shutdown();
        Ok(())
    }

    /// Listen on an OS-assigned port in the background.
    ///
    /// Returns the bound address and the server task.
    pub async fn start_dynamic(&self, mode: HttpMode) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Could not bind an ephemeral port")?;
        let addr = listener.local_addr().context("Listener has no local address")?;

        let transport = self.http_transport(mode);
        let reaper = transport.spawn_reaper();
        log_server_ready(&format!("http://{addr}/mcp"));

        let routes = transport.routes();
        let handle = tokio::spawn(async move {
            warp::serve(routes)
                .run_incoming(TcpListenerStream::new(listener))
                .await;
            if let Some(reaper) = reaper {
                reaper.abort();
            }
        });
        Ok((addr, handle))
    }
}
