//! Media type registries for request parsers and response renderers.
//!
//! A registry maps a media type essence (`type/subtype`, parameters
//! stripped) to a handler. Registration order is significant: the first
//! entry is the default, which is what an absent `Accept` header or `*/*`
//! resolves to.
//!
//! Registries are assembled at start-up and shared behind `Arc` afterwards;
//! nothing here mutates them per request.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use conneg::registry::RendererRegistry;
//! use serde_json::Value;
//!
//! let mut renderers = RendererRegistry::new();
//! renderers
//!     .register("text/fake_content", |data: &Value| {
//!         Ok(Bytes::from(data.to_string()))
//!     })
//!     .unwrap();
//!
//! let key = "TEXT/FAKE_CONTENT; charset=utf-8".parse().unwrap();
//! assert!(renderers.get(&key).is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::error::{ConnegError, Result};
use crate::media::MediaType;

/// Turns a raw request body into structured data.
///
/// The media type is the one the client sent, parameters included, so
/// parsers can honour `charset` or `boundary`.
pub trait Parser: Send + Sync {
    /// Parse `body`.
    fn parse(&self, body: &[u8], media_type: &MediaType) -> Result<Value>;
}

impl<F> Parser for F
where
    F: Fn(&[u8], &MediaType) -> Result<Value> + Send + Sync,
{
    fn parse(&self, body: &[u8], media_type: &MediaType) -> Result<Value> {
        self(body, media_type)
    }
}

/// Turns a handler's result into a response body.
pub trait Renderer: Send + Sync {
    /// Render `data`.
    fn render(&self, data: &Value) -> Result<Bytes>;
}

impl<F> Renderer for F
where
    F: Fn(&Value) -> Result<Bytes> + Send + Sync,
{
    fn render(&self, data: &Value) -> Result<Bytes> {
        self(data)
    }
}

/// Ordered mapping from media type essence to handler.
pub struct MediaRegistry<H: ?Sized> {
    entries: Vec<(MediaType, Arc<H>)>,
}

/// Registry of request body parsers.
pub type ParserRegistry = MediaRegistry<dyn Parser>;

/// Registry of response renderers.
pub type RendererRegistry = MediaRegistry<dyn Renderer>;

impl<H: ?Sized> MediaRegistry<H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a shared handler under `media_type`.
    ///
    /// Parameters are stripped from the key. Registering an existing
    /// essence replaces its handler without changing its position.
    pub fn insert(&mut self, media_type: &str, handler: Arc<H>) -> Result<()> {
        let key = MediaType::parse(media_type)?.without_params();
        if key.is_wildcard() {
            return Err(ConnegError::Config(format!(
                "cannot register a handler for wildcard media type {key}"
            )));
        }
        self.insert_concrete(key, handler);
        Ok(())
    }

    /// Register a handler under a concrete, parameterless media type.
    pub(crate) fn insert_concrete(&mut self, key: MediaType, handler: Arc<H>) {
        debug_assert!(!key.is_wildcard());
        match self.entries.iter_mut().find(|(k, _)| k.same_essence(&key)) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((key, handler)),
        }
    }

    /// Exact lookup by essence; parameters on `media_type` are ignored.
    pub fn get(&self, media_type: &MediaType) -> Option<&Arc<H>> {
        self.entries
            .iter()
            .find(|(key, _)| key.same_essence(media_type))
            .map(|(_, handler)| handler)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&MediaType, &Arc<H>)> {
        self.entries.iter().map(|(key, handler)| (key, handler))
    }

    /// The default (first registered) entry.
    pub fn default_entry(&self) -> Option<(&MediaType, &Arc<H>)> {
        self.entries.first().map(|(key, handler)| (key, handler))
    }

    /// Move `media_type` to the front so it becomes the default.
    pub fn set_default(&mut self, media_type: &str) -> Result<()> {
        let key = MediaType::parse(media_type)?;
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.same_essence(&key))
            .ok_or_else(|| {
                ConnegError::Config(format!("default media type {key} is not registered"))
            })?;
        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        Ok(())
    }

    /// Add or replace every entry of `other`, keeping this registry's order
    /// for types both contain.
    pub fn extend(&mut self, other: &Self) {
        for (key, handler) in &other.entries {
            match self.entries.iter_mut().find(|(k, _)| k.same_essence(key)) {
                Some(entry) => entry.1 = Arc::clone(handler),
                None => self.entries.push((key.clone(), Arc::clone(handler))),
            }
        }
    }

    /// Registered media types in order.
    pub fn media_types(&self) -> impl Iterator<Item = &MediaType> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Number of registered media types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comma-separated list of registered types, for error messages.
    pub fn describe(&self) -> String {
        self.media_types()
            .map(MediaType::essence)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl MediaRegistry<dyn Parser> {
    /// Register a parser function or closure.
    pub fn register<F>(&mut self, media_type: &str, parser: F) -> Result<()>
    where
        F: Fn(&[u8], &MediaType) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(media_type, Arc::new(parser))
    }
}

impl MediaRegistry<dyn Renderer> {
    /// Register a renderer function or closure.
    pub fn register<F>(&mut self, media_type: &str, renderer: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<Bytes> + Send + Sync + 'static,
    {
        self.insert(media_type, Arc::new(renderer))
    }
}

impl<H: ?Sized> Default for MediaRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> Clone for MediaRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(key, handler)| (key.clone(), Arc::clone(handler)))
                .collect(),
        }
    }
}

impl<H: ?Sized> fmt::Debug for MediaRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.media_types().map(MediaType::essence))
            .finish()
    }
}
