//! HTTP response value type.
//!
//! A [`Response`] carries its content type both as a field and as a header,
//! and keeps the `Content-Length` header in step with the body on every
//! mutation. The [`ResponseEncoder`](crate::codec::ResponseEncoder) rewrites
//! the reserved headers anyway, so these values only matter to middleware
//! that inspect the response before it reaches the wire.

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use crate::date::DateService;
use crate::handler::HandlerError;

/// Value of the `Server` header when none is configured.
pub const DEFAULT_SERVER_NAME: &str = "mini-boot";

/// Content type used when a response has none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Content type of JSON bodies built by [`Response::json`].
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates a response with `Content-Type`, `Content-Length`, `Connection`, `Date` and `Server` preset.
    ///
    /// A blank content type falls back to [`DEFAULT_CONTENT_TYPE`].
    pub fn new(status: StatusCode, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() { DEFAULT_CONTENT_TYPE.to_string() } else { content_type };

        let mut response = Self { status, content_type, headers: HeaderMap::with_capacity(8), body: body.into() };

        if let Ok(value) = HeaderValue::from_str(&response.content_type) {
            response.headers.insert(CONTENT_TYPE, value);
        }
        response.headers.insert(CONTENT_LENGTH, HeaderValue::from(response.body.len()));
        response.headers.insert(CONNECTION, HeaderValue::from_static("close"));
        DateService::global().with_http_date(|date| {
            response.headers.insert(DATE, date);
        });
        response.headers.insert(SERVER, HeaderValue::from_static(DEFAULT_SERVER_NAME));
        response
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, DEFAULT_CONTENT_TYPE, body)
    }

    /// An already serialized JSON body.
    pub fn json_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, JSON_CONTENT_TYPE, body)
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Internal`] when `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_vec(value).map_err(HandlerError::internal)?;
        Ok(Self::json_bytes(status, body))
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, DEFAULT_CONTENT_TYPE, Bytes::new())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing earlier values of the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body and recomputes `Content-Length`.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Reason phrase written on the status line. Unmapped codes fall back to `OK`.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "OK",
    }
}
