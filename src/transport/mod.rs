//! Transport layer for serving negotiated routers.
//!
//! The router built by [`crate::api::Api`] is transport-agnostic; a
//! [`Transport`] binds it to the network. TCP (HTTP/1.1) is the only
//! backend.
//!
//! # Usage
//!
//! ```rust,ignore
//! use conneg::transport::{TcpTransport, Transport};
//!
//! let transport = TcpTransport::localhost(3000);
//! transport.serve(router).await?;
//! ```

mod tcp;

pub use tcp::TcpTransport;

use crate::error::Result;
use axum::Router;
use std::future::Future;
use std::pin::Pin;

/// Transport trait for pluggable network backends.
///
/// Implementations handle the low-level network protocol while
/// the router remains transport-agnostic.
pub trait Transport: Send + Sync {
    /// Serve the given Axum router on this transport.
    ///
    /// This method should run until shutdown is signaled.
    fn serve(&self, router: Router) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;

    /// Get the listen address as a string.
    fn listen_addr(&self) -> String;
}
