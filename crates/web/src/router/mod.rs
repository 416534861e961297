//! Request routing
//!
//! A [`Router`] is an ordered table of [`Route`]s built once at startup. For an
//! incoming request it tells "no route has this path" (404) apart from "the
//! path exists but not for this method" (405).
//!
//! Every route handler, and the two fallback handlers, is wrapped by the
//! router's [`MiddlewareChain`] when the router is built, so the chain runs
//! for routed and unrouted requests alike.
//!
//! # Example
//!
//! ```
//! use miniboot_web::router::{Router, get, post};
//! use miniboot_web::builtin::{echo, health};
//! use miniboot_http::handler::handler_fn;
//!
//! let router = Router::builder()
//!     .route("/health", get(handler_fn(health)))
//!     .route("/echo", get(handler_fn(echo)))
//!     .route("/echo", post(handler_fn(echo)).protected())
//!     .build();
//!
//! assert_eq!(router.routes().len(), 3);
//! ```

mod params;
mod path_pattern;

pub use params::{PathParams, Protected, RequestExt};
pub use path_pattern::{PathPattern, Segment, SegmentKind};

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use miniboot_http::handler::{BoxHandler, Handler, HandlerError, handler_fn};
use miniboot_http::protocol::{Request, Response};
use tracing::debug;

use crate::middleware::MiddlewareChain;

/// How a router picks among several routes matching the same method and path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The route registered first wins.
    #[default]
    FirstRegistered,
    /// The route with the highest [`PathPattern::score`] wins; registration order breaks ties.
    MostSpecific,
}

/// A registered `(method, pattern, handler)` triple.
pub struct Route {
    method: Method,
    pattern: PathPattern,
    protected: bool,
    handler: BoxHandler,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.template())
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

/// Outcome of looking a request up in the route table.
#[derive(Debug)]
pub enum RouteMatch<'router> {
    Found { route: &'router Route, params: PathParams },
    MethodNotAllowed,
    NotFound,
}

pub struct Router {
    routes: Vec<Route>,
    policy: MatchPolicy,
    middleware_names: Vec<&'static str>,
    not_found: BoxHandler,
    method_not_allowed: BoxHandler,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Names of the middleware wrapping every handler, outermost first.
    pub fn middleware_names(&self) -> &[&'static str] {
        &self.middleware_names
    }

    /// Finds the route for `method` and `path`.
    ///
    /// `path` is matched segment by segment; variable values are percent-decoded
    /// once, so pass the still-encoded path.
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut path_exists = false;
        let mut best: Option<&Route> = None;

        for route in &self.routes {
            if !route.pattern.matches(path) {
                continue;
            }
            path_exists = true;
            if route.method != *method {
                continue;
            }

            match self.policy {
                MatchPolicy::FirstRegistered => {
                    best = Some(route);
                    break;
                }
                MatchPolicy::MostSpecific => {
                    if best.is_none_or(|current| route.pattern.score() > current.pattern.score()) {
                        best = Some(route);
                    }
                }
            }
        }

        match best.and_then(|route| route.pattern.captures(path).map(|params| (route, params))) {
            Some((route, params)) => RouteMatch::Found { route, params },
            None if path_exists => RouteMatch::MethodNotAllowed,
            None => RouteMatch::NotFound,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("policy", &self.policy)
            .field("middleware_names", &self.middleware_names)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, mut req: Request) -> Result<Response, HandlerError> {
        match self.resolve(req.method(), req.raw_path()) {
            RouteMatch::Found { route, params } => {
                debug!(method = %req.method(), path = req.path(), route = route.pattern.template(), "route matched");
                req.extensions_mut().insert(params);
                req.extensions_mut().insert(Protected(route.protected));
                route.handler.call(req).await
            }
            RouteMatch::MethodNotAllowed => self.method_not_allowed.call(req).await,
            RouteMatch::NotFound => self.not_found.call(req).await,
        }
    }
}

async fn not_found(_req: Request) -> Result<Response, HandlerError> {
    Err(HandlerError::NotFound)
}

async fn method_not_allowed(_req: Request) -> Result<Response, HandlerError> {
    Err(HandlerError::MethodNotAllowed)
}

pub struct RouterBuilder {
    routes: Vec<(String, RouteItemBuilder)>,
    chain: MiddlewareChain,
    policy: MatchPolicy,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: vec![], chain: MiddlewareChain::builder().build(), policy: MatchPolicy::default() }
    }

    /// Registers a route. Routes keep their registration order.
    pub fn route(mut self, path: impl Into<String>, item_builder: RouteItemBuilder) -> Self {
        self.routes.push((path.into(), item_builder));
        self
    }

    /// Sets the chain wrapping every handler of this router.
    pub fn middleware(mut self, chain: MiddlewareChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Router {
        let chain = self.chain;
        let routes = self
            .routes
            .into_iter()
            .map(|(path, item)| Route {
                method: item.method,
                pattern: PathPattern::new(&path),
                protected: item.protected,
                handler: chain.wrap(item.handler),
            })
            .collect();

        Router {
            routes,
            policy: self.policy,
            middleware_names: chain.names(),
            not_found: chain.wrap(Arc::new(handler_fn(not_found))),
            method_not_allowed: chain.wrap(Arc::new(handler_fn(method_not_allowed))),
        }
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder").field("chain", &self.chain).field("policy", &self.policy).finish_non_exhaustive()
    }
}

/// Method, handler and flags of a route, before its path is attached.
pub struct RouteItemBuilder {
    method: Method,
    handler: BoxHandler,
    protected: bool,
}

impl RouteItemBuilder {
    pub fn new<H: Handler + 'static>(method: Method, handler: H) -> Self {
        Self { method, handler: Arc::new(handler), protected: false }
    }

    /// Requires a verified `Authorization` header for this route.
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

impl std::fmt::Debug for RouteItemBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteItemBuilder").field("method", &self.method).field("protected", &self.protected).finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        pub fn $name<H: Handler + 'static>(handler: H) -> RouteItemBuilder {
            RouteItemBuilder::new(Method::$method, handler)
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(patch, PATCH);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
