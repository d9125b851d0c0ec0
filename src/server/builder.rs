// src/server/builder.rs
use crate::server::listener::bind_tcp;
use anyhow::Result;
use hyper::{server::conn::Http, Body, Request, Response};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::Service;

/// Entry point for wiring the server: `main` injects the request handler
/// without the server module knowing anything about the engine. A handler
/// is required to reach a servable state, so there is no half-built server
/// to misuse.
pub struct ServerBuilder {
    addr: SocketAddr,
}

impl ServerBuilder {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn with_handler<H>(self, handler: H) -> BoundServer<H>
    where
        H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
        H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        H::Future: Send + 'static,
    {
        BoundServer {
            addr: self.addr,
            handler,
        }
    }
}

/// A server with its handler attached, ready to bind and accept.
pub struct BoundServer<H> {
    addr: SocketAddr,
    handler: H,
}

impl<H> BoundServer<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    /// Bind the configured address and serve until the process is torn down.
    pub async fn serve(self) -> Result<()> {
        let listener = bind_tcp(self.addr).await?;
        tracing::info!("HTTP server listening on {}", self.addr);
        self.run(listener).await
    }

    /// Accept connections from an already-bound listener, one spawned task
    /// per connection.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let svc = self.handler.clone();

            tokio::spawn(async move {
                let http = Http::new();
                if let Err(err) = http.serve_connection(stream, svc).await {
                    tracing::warn!(%peer, %err, "connection error");
                }
            });
        }
    }
}
