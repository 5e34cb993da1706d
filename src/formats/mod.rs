//! Built-in request parsers and response renderers.
//!
//! | Name      | Media type                  | Parser | Renderer |
//! |-----------|-----------------------------|--------|----------|
//! | `json`    | `application/json`          | yes    | yes      |
//! | `jsonapi` | `application/vnd.api+json`  | yes    | yes      |
//! | `csv`     | `text/csv`                  | yes    | yes      |
//! | `text`    | `text/plain`                | yes    | yes      |
//!
//! `json` and `jsonapi` are always registered; the others are opt-in by
//! name from configuration (see [`Format::lookup`]).

pub mod csv;
pub mod json;
pub mod text;

use std::sync::Arc;

use bytes::Bytes;
use phf::phf_map;
use serde_json::Value;

use crate::error::{ConnegError, Result};
use crate::media::MediaType;
use crate::registry::{Parser, ParserRegistry, Renderer, RendererRegistry};

/// A named built-in format.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    /// Media type the handlers are registered under.
    pub media_type: &'static str,
    /// Request body parser.
    pub parse: fn(&[u8], &MediaType) -> Result<Value>,
    /// Response renderer.
    pub render: fn(&Value) -> Result<Bytes>,
}

/// Built-in formats by configuration name.
pub static FORMATS: phf::Map<&'static str, Format> = phf_map! {
    "json" => Format {
        media_type: crate::JSON_MEDIA_TYPE,
        parse: json::parse,
        render: json::render,
    },
    "jsonapi" => Format {
        media_type: crate::JSONAPI_MEDIA_TYPE,
        parse: json::parse,
        render: json::render,
    },
    "csv" => Format {
        media_type: "text/csv",
        parse: csv::parse,
        render: csv::render,
    },
    "text" => Format {
        media_type: "text/plain",
        parse: text::parse,
        render: text::render,
    },
};

impl Format {
    /// Look up a built-in format by name (case-insensitive).
    pub fn lookup(name: &str) -> Result<&'static Format> {
        FORMATS
            .get(name.trim().to_ascii_lowercase().as_str())
            .ok_or_else(|| {
                let mut known: Vec<&str> = FORMATS.keys().copied().collect();
                known.sort_unstable();
                ConnegError::Config(format!(
                    "unknown format {name:?} (known: {})",
                    known.join(", ")
                ))
            })
    }

    /// Register this format's parser and renderer.
    pub fn register(
        &self,
        parsers: &mut ParserRegistry,
        renderers: &mut RendererRegistry,
    ) -> Result<()> {
        parsers.register(self.media_type, self.parse)?;
        renderers.register(self.media_type, self.render)
    }
}

/// Parsers registered when nothing else is configured.
pub fn default_parsers() -> ParserRegistry {
    let parser: Arc<dyn Parser> = Arc::new(json::parse);
    let mut parsers = ParserRegistry::new();
    parsers.insert_concrete(jsonapi_type(), Arc::clone(&parser));
    parsers.insert_concrete(json_type(), parser);
    parsers
}

/// Renderers registered when nothing else is configured; `application/json`
/// is the default.
pub fn default_renderers() -> RendererRegistry {
    let renderer: Arc<dyn Renderer> = Arc::new(json::render);
    let mut renderers = RendererRegistry::new();
    renderers.insert_concrete(json_type(), Arc::clone(&renderer));
    renderers.insert_concrete(jsonapi_type(), renderer);
    renderers
}

fn json_type() -> MediaType {
    MediaType::new("application", "json")
}

fn jsonapi_type() -> MediaType {
    MediaType::new("application", "vnd.api+json")
}
