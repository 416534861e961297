//! The contract between the engine and business code.
//!
//! A [`Handler`] turns a [`Request`] into a [`Response`] or fails with a
//! [`HandlerError`]. Middleware are handlers that wrap other handlers, and the
//! router itself is a handler, so the whole dispatch pipeline is expressed in
//! terms of this one trait.

use std::error::Error;
use std::future::Future;
use std::num::{ParseFloatError, ParseIntError};
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

use crate::protocol::{Request, Response};

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: Request) -> Result<Response, HandlerError>;
}

/// A shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        self.as_ref().call(req).await
    }
}

/// Failure of a handler.
///
/// `BadRequest` plays the role of an argument error: anything the client got
/// wrong. Parse failures of numbers and JSON convert into it, so `?` on
/// `id.parse::<u64>()` inside a handler yields a 400.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no route matches the request path")]
    NotFound,

    #[error("the request path does not accept this method")]
    MethodNotAllowed,

    #[error("internal error: {0}")]
    Internal(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn bad_request<S: ToString>(reason: S) -> Self {
        Self::BadRequest(reason.to_string())
    }

    pub fn internal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Internal(e.into())
    }

    /// The status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HandlerError::NotFound => StatusCode::NOT_FOUND,
            HandlerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ParseIntError> for HandlerError {
    fn from(e: ParseIntError) -> Self {
        Self::bad_request(e)
    }
}

impl From<ParseFloatError> for HandlerError {
    fn from(e: ParseFloatError) -> Self {
        Self::bad_request(e)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() { Self::internal(e) } else { Self::bad_request(e) }
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send,
{
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        (self.f)(req).await
    }
}

/// Wraps an async function or closure into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send,
{
    HandlerFn { f }
}
