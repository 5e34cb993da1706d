//! Route registration with content negotiation.
//!
//! [`Api`] is where handler maps meet routes. Every route goes through
//! the negotiation middleware; [`Api::route`] uses the application-wide
//! maps, [`Api::route_with`] hands the route its own [`ContentConfig`],
//! which takes precedence over the global maps for that route only.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::routing::get;
//! use conneg::{api::Api, formats::csv, negotiation::{ContentConfig, Document}};
//!
//! let global = ContentConfig::new()
//!     .parser("text/csv", csv::parse)?
//!     .renderer("text/csv", csv::render)?;
//!
//! let router = Api::new(&global)
//!     .route("/persons", get(list_persons).post(create_person))
//!     .route_with("/report", get(report), &report_content)
//!     .into_router();
//! ```

use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use axum::Router;

use crate::negotiation::{negotiate, ContentConfig, ContentNegotiator};

/// Router builder that wraps each route in content negotiation.
#[derive(Debug)]
pub struct Api<S = ()> {
    negotiator: ContentNegotiator,
    router: Router<S>,
}

impl<S> Api<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Built-in handlers extended by `global`.
    pub fn new(global: &ContentConfig) -> Self {
        Self::with_negotiator(ContentNegotiator::default().with_global(global))
    }

    /// Use a fully configured negotiator as the global one.
    pub fn with_negotiator(negotiator: ContentNegotiator) -> Self {
        Self {
            negotiator,
            router: Router::new(),
        }
    }

    /// Register a route using the global handler maps.
    pub fn route(self, path: &str, method_router: MethodRouter<S>) -> Self {
        let negotiator = self.negotiator.clone();
        self.mount(path, method_router, negotiator)
    }

    /// Register a route whose declared handler maps replace the global
    /// ones.
    pub fn route_with(
        self,
        path: &str,
        method_router: MethodRouter<S>,
        content: &ContentConfig,
    ) -> Self {
        let negotiator = self.negotiator.for_resource(content);
        self.mount(path, method_router, negotiator)
    }

    fn mount(
        mut self,
        path: &str,
        method_router: MethodRouter<S>,
        negotiator: ContentNegotiator,
    ) -> Self {
        tracing::debug!(
            path,
            parsers = %negotiator.parsers().describe(),
            renderers = %negotiator.renderers().describe(),
            "registering negotiated route"
        );
        let method_router = method_router.layer(from_fn_with_state(negotiator, negotiate));
        self.router = self.router.route(path, method_router);
        self
    }

    /// The global negotiator.
    pub fn negotiator(&self) -> &ContentNegotiator {
        &self.negotiator
    }

    /// Finish registration.
    pub fn into_router(self) -> Router<S> {
        self.router
    }
}
