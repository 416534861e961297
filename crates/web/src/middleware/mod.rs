//! Cross-cutting behavior around handlers.
//!
//! A [`Middleware`] turns a handler into another handler. A [`MiddlewareChain`]
//! is an explicit, ordered list of them: the first entry is the outermost
//! wrapper, so requests pass the middleware in list order and responses come
//! back through them in reverse.
//!
//! The chain used by the server binary is [`MiddlewareChain::standard`]:
//!
//! 1. [`ErrorHandle`] turns every failure from further in into a JSON response
//! 2. [`Logging`] writes one line per request
//! 3. [`Cors`] adds the CORS headers
//! 4. [`Auth`] guards routes registered as protected

mod auth;
mod cors;
mod error_handle;
mod logging;

pub use auth::{Auth, StaticTokenVerifier, TokenError, TokenVerifier};
pub use cors::Cors;
pub use error_handle::ErrorHandle;
pub use logging::Logging;

use std::fmt;
use std::sync::Arc;

use miniboot_http::handler::BoxHandler;

pub trait Middleware: Send + Sync {
    /// Short name, used to report the chain order.
    fn name(&self) -> &'static str;

    fn decorate(&self, next: BoxHandler) -> BoxHandler;
}

#[derive(Clone)]
pub struct MiddlewareChain {
    inner: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn builder() -> MiddlewareChainBuilder {
        MiddlewareChainBuilder::new()
    }

    /// `ErrorHandle`, `Logging`, `Cors`, `Auth`, in that order.
    pub fn standard(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self::builder().add_last(ErrorHandle).add_last(Logging).add_last(Cors).add_last(Auth::new(verifier)).build()
    }

    /// Middleware names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.inner.iter().map(|middleware| middleware.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Wraps `terminal` so that the first middleware of the chain runs first.
    pub fn wrap(&self, terminal: BoxHandler) -> BoxHandler {
        self.inner.iter().rev().fold(terminal, |next, middleware| middleware.decorate(next))
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub struct MiddlewareChainBuilder {
    inner: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChainBuilder {
    fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn add_last<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.inner.push(Arc::new(middleware));
        self
    }

    pub fn add_first<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.inner.insert(0, Arc::new(middleware));
        self
    }

    pub fn build(self) -> MiddlewareChain {
        MiddlewareChain { inner: self.inner }
    }
}

impl fmt::Debug for MiddlewareChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter().map(|middleware| middleware.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{HeaderName, HeaderValue, StatusCode};
    use miniboot_http::handler::{Handler, HandlerError, handler_fn};
    use miniboot_http::protocol::{Request, Response};

    /// Appends its tag to the `x-trace` header on the way out.
    struct Tag(&'static str);

    struct Tagged {
        tag: &'static str,
        next: BoxHandler,
    }

    #[async_trait]
    impl Handler for Tagged {
        async fn call(&self, req: Request) -> Result<Response, HandlerError> {
            let mut response = self.next.call(req).await?;
            let trace = match response.headers().get("x-trace").and_then(|value| value.to_str().ok()) {
                Some(trace) => format!("{trace},{}", self.tag),
                None => self.tag.to_string(),
            };
            response.insert_header(HeaderName::from_static("x-trace"), HeaderValue::from_str(&trace).unwrap());
            Ok(response)
        }
    }

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn decorate(&self, next: BoxHandler) -> BoxHandler {
            Arc::new(Tagged { tag: self.0, next })
        }
    }

    async fn ok(_req: Request) -> Result<Response, HandlerError> {
        Ok(Response::text(StatusCode::OK, "ok"))
    }

    #[tokio::test]
    async fn first_added_is_outermost() {
        let chain = MiddlewareChain::builder().add_last(Tag("b")).add_last(Tag("c")).add_first(Tag("a")).build();
        assert_eq!(chain.names(), vec!["a", "b", "c"]);

        let handler = chain.wrap(Arc::new(handler_fn(ok)));
        let response = handler.call(Request::builder().build()).await.unwrap();

        // responses unwind innermost first
        assert_eq!(response.headers().get("x-trace").unwrap(), "c,b,a");
    }

    #[tokio::test]
    async fn empty_chain_is_identity() {
        let chain = MiddlewareChain::builder().build();
        assert!(chain.is_empty());

        let response = chain.wrap(Arc::new(handler_fn(ok))).call(Request::builder().build()).await.unwrap();
        assert_eq!(&response.body()[..], b"ok");
    }

    #[test]
    fn standard_order() {
        let chain = MiddlewareChain::standard(Arc::new(StaticTokenVerifier::new(["secret"])));
        assert_eq!(chain.names(), vec!["error_handle", "logging", "cors", "auth"]);
    }
}
