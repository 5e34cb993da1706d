//! TCP transport.
//!
//! HTTP/1.1 over TCP using Axum's built-in server.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::Router;
use tokio::net::TcpListener;

use super::Transport;
use crate::error::{ConnegError, Result};

/// TCP/HTTP transport using Axum's built-in server.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Address to listen on.
    listen_addr: SocketAddr,
}

impl TcpTransport {
    /// Create a new TCP transport.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self { listen_addr }
    }

    /// Create with default localhost address.
    pub fn localhost(port: u16) -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    /// Address this transport binds to.
    pub fn addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(&self, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ConnegError::Server(format!("TCP server error: {}", e)))
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = self.listen_addr;
        tracing::info!("TCP transport listening on {}", addr);

        TcpListener::bind(addr)
            .await
            .map_err(|e| ConnegError::Server(format!("Failed to bind TCP to {}: {}", addr, e)))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::localhost(3000)
    }
}

impl Transport for TcpTransport {
    fn serve(
        &self,
        router: Router,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let listener = self.bind().await?;

            axum::serve(listener, router)
                .await
                .map_err(|e| ConnegError::Server(format!("TCP server error: {}", e)))?;

            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "TCP/HTTP"
    }

    fn listen_addr(&self) -> String {
        format!("http://{}", self.listen_addr)
    }
}
