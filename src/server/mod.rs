//! Demo JSON:API server.
//!
//! Serves an in-memory `person` resource through the negotiation layer:
//! - `GET/POST /persons`
//! - `GET/PATCH/DELETE /persons/:id`
//! - `GET /health` (plain JSON, not negotiated)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use conneg::server::{create_router, AppState, ServerConfig};
//! use conneg::transport::TcpTransport;
//!
//! let config = ServerConfig::default().with_port(8080);
//! let transport = TcpTransport::new(config.addr);
//! let router = create_router(Arc::new(AppState::new(config)), negotiator);
//! transport.serve(router).await?;
//! ```

mod config;
mod handlers;
mod state;

pub use config::ServerConfig;
pub use handlers::{create_router, health_check, person_resource, PERSON_TYPE};
pub use state::{AppState, Person, PersonChanges, PersonStore};
