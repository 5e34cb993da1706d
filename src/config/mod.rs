//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the server)
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [negotiation]
//! formats = ["csv"]
//! default_renderer = "application/vnd.api+json"
//! strict_jsonapi = true
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConnegError, Result};
use crate::formats::{default_parsers, default_renderers, Format};
use crate::negotiation::ContentNegotiator;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSection,

    /// Content negotiation configuration
    #[serde(default)]
    pub negotiation: NegotiationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConnegError::Config(format!("Failed to read config file: {e}")))?;

        Ok(toml::from_str(&content)?)
    }

    /// Default config file location (`<config dir>/conneg/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("conneg").join("config.toml"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server settings
        if let Ok(host) = std::env::var("CONNEG_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("CONNEG_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }
        if let Ok(size) = std::env::var("CONNEG_MAX_BODY_SIZE") {
            if let Ok(size) = size.parse() {
                config.server.max_body_size = size;
            }
        }

        // Negotiation settings
        if let Ok(formats) = std::env::var("CONNEG_FORMATS") {
            config.negotiation.formats = formats
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(default) = std::env::var("CONNEG_DEFAULT_RENDERER") {
            config.negotiation.default_renderer = Some(default);
        }
        if let Ok(strict) = std::env::var("CONNEG_STRICT_JSONAPI") {
            if let Ok(strict) = strict.parse() {
                config.negotiation.strict_jsonapi = strict;
            }
        }

        config
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(self, other: Self) -> Self {
        let server_defaults = ServerSection::default();
        let negotiation_defaults = NegotiationConfig::default();

        Self {
            server: ServerSection {
                host: if other.server.host != server_defaults.host {
                    other.server.host
                } else {
                    self.server.host
                },
                port: if other.server.port != server_defaults.port {
                    other.server.port
                } else {
                    self.server.port
                },
                max_body_size: if other.server.max_body_size != server_defaults.max_body_size {
                    other.server.max_body_size
                } else {
                    self.server.max_body_size
                },
                logging: if other.server.logging != server_defaults.logging {
                    other.server.logging
                } else {
                    self.server.logging
                },
                cors: if other.server.cors != server_defaults.cors {
                    other.server.cors
                } else {
                    self.server.cors
                },
            },
            negotiation: NegotiationConfig {
                formats: if other.negotiation.formats.is_empty() {
                    self.negotiation.formats
                } else {
                    other.negotiation.formats
                },
                default_renderer: other
                    .negotiation
                    .default_renderer
                    .or(self.negotiation.default_renderer),
                strict_jsonapi: if other.negotiation.strict_jsonapi
                    != negotiation_defaults.strict_jsonapi
                {
                    other.negotiation.strict_jsonapi
                } else {
                    self.negotiation.strict_jsonapi
                },
            },
        }
    }

    /// Build the global negotiator this configuration describes.
    pub fn negotiator(&self) -> Result<ContentNegotiator> {
        Ok(self
            .negotiation
            .build()?
            .with_max_body_size(self.server.max_body_size))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable request tracing
    pub logging: bool,

    /// Enable permissive CORS
    pub cors: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_body_size: 10 * 1024 * 1024, // 10 MB
            logging: true,
            cors: false,
        }
    }
}

impl ServerSection {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Content negotiation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Built-in formats to enable on top of JSON and JSON:API
    /// (`csv`, `text`)
    pub formats: Vec<String>,

    /// Media type to render when the client expresses no preference
    pub default_renderer: Option<String>,

    /// Refuse parameterised JSON:API media types
    pub strict_jsonapi: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            formats: Vec::new(),
            default_renderer: None,
            strict_jsonapi: true,
        }
    }
}

impl NegotiationConfig {
    /// Build a negotiator: built-in defaults, then the named formats, then
    /// the default renderer.
    pub fn build(&self) -> Result<ContentNegotiator> {
        let mut parsers = default_parsers();
        let mut renderers = default_renderers();

        for name in &self.formats {
            Format::lookup(name)?.register(&mut parsers, &mut renderers)?;
        }
        if let Some(default) = &self.default_renderer {
            renderers.set_default(default)?;
        }

        Ok(ContentNegotiator::new(parsers, renderers).with_strict_jsonapi(self.strict_jsonapi))
    }
}
