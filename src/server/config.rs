//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::Config;
use crate::error::{ConnegError, Result};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Enable request logging
    pub logging: bool,
    /// CORS enabled
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            logging: true,
            cors_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Build from the `[server]` section of a loaded [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let addr = config.server.listen_addr();
        let addr = addr
            .parse()
            .map_err(|e| ConnegError::Config(format!("invalid listen address {addr:?}: {e}")))?;

        Ok(Self {
            addr,
            logging: config.server.logging,
            cors_enabled: config.server.cors,
        })
    }

    /// Create with custom port
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Bind to all interfaces
    pub fn bind_all(mut self) -> Self {
        self.addr.set_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        self
    }

    /// Set address directly
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Disable logging
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    /// Enable permissive CORS
    pub fn with_cors(mut self) -> Self {
        self.cors_enabled = true;
        self
    }
}
