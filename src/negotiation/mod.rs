//! Content negotiation.
//!
//! A [`ContentNegotiator`] owns one parser registry and one renderer
//! registry and answers two questions per request:
//!
//! - which parser handles the body, from `Content-Type` ([`select_parser`]);
//! - which renderer produces the response, from `Accept` ([`select_renderer`]).
//!
//! Handler maps come from three layers. The built-in defaults
//! (`application/json`, `application/vnd.api+json`) are extended by the
//! application-wide [`ContentConfig`] ([`with_global`]). A route may pass
//! its own [`ContentConfig`]; any map it declares replaces the global map
//! for that route only ([`for_resource`]).
//!
//! # Example
//!
//! ```
//! use axum::http::Method;
//! use conneg::negotiation::{ContentConfig, ContentNegotiator};
//! use conneg::formats::csv;
//!
//! let global = ContentConfig::new()
//!     .parser("text/csv", csv::parse).unwrap()
//!     .renderer("text/csv", csv::render).unwrap();
//! let negotiator = ContentNegotiator::default().with_global(&global);
//!
//! let renderer = negotiator.select_renderer(Some("text/csv")).unwrap();
//! assert_eq!(renderer.media_type.essence(), "text/csv");
//!
//! let parser = negotiator
//!     .select_parser(&Method::POST, Some("text/csv; charset=utf-8"), 10)
//!     .unwrap();
//! assert!(parser.is_some());
//! ```
//!
//! [`select_parser`]: ContentNegotiator::select_parser
//! [`select_renderer`]: ContentNegotiator::select_renderer
//! [`with_global`]: ContentNegotiator::with_global
//! [`for_resource`]: ContentNegotiator::for_resource

mod middleware;

pub use middleware::{negotiate, Document, Negotiated, ParsedBody};

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde_json::Value;

use crate::error::{ConnegError, Result};
use crate::formats::{default_parsers, default_renderers};
use crate::media::{AcceptEntry, AcceptHeader, MediaType};
use crate::registry::{Parser, ParserRegistry, Renderer, RendererRegistry};
use crate::JSONAPI_MEDIA_TYPE;

/// Default maximum request body size (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Parameters the JSON:API media type may carry without being rejected.
const JSONAPI_ALLOWED_PARAMS: &[&str] = &["charset"];

/// A handler chosen for one request.
pub struct Selection<H: ?Sized> {
    /// Registered media type the handler is keyed under.
    pub media_type: MediaType,
    /// What the client sent (`Content-Type`, or the matching `Accept`
    /// range), parameters included.
    pub requested: Option<MediaType>,
    /// The handler.
    pub handler: Arc<H>,
}

/// A selected request parser.
pub type ParserSelection = Selection<dyn Parser>;

/// A selected response renderer.
pub type RendererSelection = Selection<dyn Renderer>;

impl<H: ?Sized> Clone for Selection<H> {
    fn clone(&self) -> Self {
        Self {
            media_type: self.media_type.clone(),
            requested: self.requested.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: ?Sized> fmt::Debug for Selection<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("media_type", &self.media_type.essence())
            .field("requested", &self.requested.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

/// Parser and renderer maps declared by an application or a resource.
///
/// A map left undeclared (`None`) inherits from the enclosing level.
#[derive(Debug, Clone, Default)]
pub struct ContentConfig {
    parsers: Option<ParserRegistry>,
    renderers: Option<RendererRegistry>,
}

impl ContentConfig {
    /// Empty configuration; declares nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parser, starting the parser map if needed.
    pub fn parser<F>(mut self, media_type: &str, parser: F) -> Result<Self>
    where
        F: Fn(&[u8], &MediaType) -> Result<Value> + Send + Sync + 'static,
    {
        self.parsers
            .get_or_insert_with(ParserRegistry::new)
            .register(media_type, parser)?;
        Ok(self)
    }

    /// Declare a renderer, starting the renderer map if needed.
    pub fn renderer<F>(mut self, media_type: &str, renderer: F) -> Result<Self>
    where
        F: Fn(&Value) -> Result<Bytes> + Send + Sync + 'static,
    {
        self.renderers
            .get_or_insert_with(RendererRegistry::new)
            .register(media_type, renderer)?;
        Ok(self)
    }

    /// Declare a whole parser map.
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Some(parsers);
        self
    }

    /// Declare a whole renderer map.
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = Some(renderers);
        self
    }

    /// Declared parser map, if any.
    pub fn parsers(&self) -> Option<&ParserRegistry> {
        self.parsers.as_ref()
    }

    /// Declared renderer map, if any.
    pub fn renderers(&self) -> Option<&RendererRegistry> {
        self.renderers.as_ref()
    }

    /// True if neither map is declared.
    pub fn is_empty(&self) -> bool {
        self.parsers.is_none() && self.renderers.is_none()
    }
}

/// Selects parsers and renderers for requests.
///
/// Cheap to clone; the registries are shared and never mutated once
/// built.
#[derive(Debug, Clone)]
pub struct ContentNegotiator {
    parsers: Arc<ParserRegistry>,
    renderers: Arc<RendererRegistry>,
    strict_jsonapi: bool,
    max_body_size: usize,
}

impl Default for ContentNegotiator {
    fn default() -> Self {
        Self::new(default_parsers(), default_renderers())
    }
}

impl ContentNegotiator {
    /// Create a negotiator over explicit registries.
    pub fn new(parsers: ParserRegistry, renderers: RendererRegistry) -> Self {
        Self {
            parsers: Arc::new(parsers),
            renderers: Arc::new(renderers),
            strict_jsonapi: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Toggle the JSON:API media type parameter rules.
    pub fn with_strict_jsonapi(mut self, strict: bool) -> Self {
        self.strict_jsonapi = strict;
        self
    }

    /// Set the maximum accepted request body size in bytes.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Merge application-wide handlers on top of the current maps.
    pub fn with_global(&self, config: &ContentConfig) -> Self {
        let mut next = self.clone();
        if let Some(parsers) = config.parsers() {
            let mut merged = (*self.parsers).clone();
            merged.extend(parsers);
            next.parsers = Arc::new(merged);
        }
        if let Some(renderers) = config.renderers() {
            let mut merged = (*self.renderers).clone();
            merged.extend(renderers);
            next.renderers = Arc::new(merged);
        }
        next
    }

    /// Negotiator for a single resource: declared maps replace the
    /// current ones outright, undeclared maps are inherited.
    pub fn for_resource(&self, config: &ContentConfig) -> Self {
        let mut next = self.clone();
        if let Some(parsers) = config.parsers() {
            next.parsers = Arc::new(parsers.clone());
        }
        if let Some(renderers) = config.renderers() {
            next.renderers = Arc::new(renderers.clone());
        }
        next
    }

    /// Parser registry in effect.
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Renderer registry in effect.
    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    /// Whether the JSON:API parameter rules are enforced.
    pub fn strict_jsonapi(&self) -> bool {
        self.strict_jsonapi
    }

    /// Maximum accepted request body size in bytes.
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Choose the parser for a request body.
    ///
    /// Returns `Ok(None)` for bodyless requests: GET, HEAD, DELETE or
    /// OPTIONS with an empty body, whatever their `Content-Type`. POST, PUT
    /// and PATCH always carry a body and must name a registered type.
    pub fn select_parser(
        &self,
        method: &Method,
        content_type: Option<&str>,
        body_len: usize,
    ) -> Result<Option<ParserSelection>> {
        if !expects_body(method) && body_len == 0 {
            return Ok(None);
        }

        let Some(raw) = content_type.map(str::trim).filter(|ct| !ct.is_empty()) else {
            return Err(ConnegError::UnsupportedMediaType(format!(
                "{method} requests must send a Content-Type header (supported: {})",
                self.parsers.describe()
            )));
        };

        let requested = MediaType::parse(raw).map_err(|_| {
            ConnegError::UnsupportedMediaType(format!("malformed Content-Type {raw:?}"))
        })?;

        if self.strict_jsonapi
            && requested.essence() == JSONAPI_MEDIA_TYPE
            && requested.has_params_other_than(JSONAPI_ALLOWED_PARAMS)
        {
            return Err(ConnegError::UnsupportedMediaType(format!(
                "Content-Type {JSONAPI_MEDIA_TYPE} must not carry media type parameters, got {requested}"
            )));
        }

        let handler = self.parsers.get(&requested).ok_or_else(|| {
            ConnegError::UnsupportedMediaType(format!(
                "{} (supported: {})",
                requested.essence(),
                self.parsers.describe()
            ))
        })?;

        Ok(Some(Selection {
            media_type: requested.without_params(),
            handler: Arc::clone(handler),
            requested: Some(requested),
        }))
    }

    /// Choose the renderer for a response.
    ///
    /// An absent or blank `Accept` header, like `*/*`, resolves to the
    /// default (first registered) renderer.
    pub fn select_renderer(&self, accept: Option<&str>) -> Result<RendererSelection> {
        let accept = accept.map(str::trim).filter(|a| !a.is_empty());

        let Some(raw) = accept else {
            let (media_type, handler) = self.renderers.default_entry().ok_or_else(|| {
                ConnegError::NotAcceptable("no response renderers are registered".into())
            })?;
            return Ok(Selection {
                media_type: media_type.clone(),
                requested: None,
                handler: Arc::clone(handler),
            });
        };

        let header = AcceptHeader::parse(raw);

        let modified_jsonapi = |entry: &AcceptEntry| {
            self.strict_jsonapi
                && entry.media_type.essence() == JSONAPI_MEDIA_TYPE
                && entry.is_modified(JSONAPI_ALLOWED_PARAMS)
        };

        if self.strict_jsonapi {
            let mut jsonapi = header
                .entries()
                .iter()
                .filter(|e| e.media_type.essence() == JSONAPI_MEDIA_TYPE)
                .peekable();
            if jsonapi.peek().is_some() && jsonapi.all(|e| modified_jsonapi(e)) {
                return Err(ConnegError::NotAcceptable(format!(
                    "every {JSONAPI_MEDIA_TYPE} instance in Accept carries media type parameters"
                )));
            }
        }

        // Ranges in preference order; a registered type takes its weight
        // from the most specific range covering it, the earliest on ties.
        let ranges: Vec<&AcceptEntry> =
            header.preferred().filter(|e| !modified_jsonapi(e)).collect();

        let mut best: Option<(f32, usize, &MediaType, &Arc<dyn Renderer>)> = None;
        for (media_type, handler) in self.renderers.iter() {
            let decisive = ranges
                .iter()
                .enumerate()
                .filter(|(_, range)| range.media_type.matches(media_type))
                .min_by_key(|(rank, range)| (Reverse(range.media_type.specificity()), *rank));
            let Some((rank, range)) = decisive else {
                continue;
            };

            if range.is_rejection() {
                continue;
            }
            let quality = range.quality();
            let better = best.map_or(true, |(q, r, _, _)| {
                quality.total_cmp(&q).then(r.cmp(&rank)) == Ordering::Greater
            });
            if better {
                best = Some((quality, rank, media_type, handler));
            }
        }

        if let Some((_, rank, media_type, handler)) = best {
            return Ok(Selection {
                media_type: media_type.clone(),
                requested: Some(ranges[rank].media_type.clone()),
                handler: Arc::clone(handler),
            });
        }

        Err(ConnegError::NotAcceptable(format!(
            "{raw} (available: {})",
            self.renderers.describe()
        )))
    }

    /// Run the selected parser over a request body.
    pub fn parse_body(&self, selection: &ParserSelection, body: &[u8]) -> Result<Value> {
        let media_type = selection.requested.as_ref().unwrap_or(&selection.media_type);
        selection
            .handler
            .parse(body, media_type)
            .map_err(|e| match e {
                err @ ConnegError::Parse(_) => err,
                other => ConnegError::Parse(other.to_string()),
            })
    }

    /// Run the selected renderer and build the response.
    ///
    /// The response `Content-Type` is the renderer's registered media
    /// type.
    pub fn render(
        &self,
        selection: &RendererSelection,
        status: StatusCode,
        data: &Value,
    ) -> Result<Response> {
        let body = selection.handler.render(data).map_err(|e| match e {
            err @ ConnegError::Render(_) => err,
            other => ConnegError::Render(other.to_string()),
        })?;

        let content_type = HeaderValue::from_str(&selection.media_type.essence())
            .map_err(|e| ConnegError::Render(e.to_string()))?;

        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .map_err(|e| ConnegError::Render(e.to_string()))
    }
}

/// Methods whose requests always carry a body.
fn expects_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}
