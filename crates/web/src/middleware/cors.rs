use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderValue;
use http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use miniboot_http::handler::{BoxHandler, Handler, HandlerError};
use miniboot_http::protocol::{Request, Response};

use crate::middleware::Middleware;

/// Sets `Access-Control-Allow-Origin: *` and
/// `Access-Control-Allow-Headers: Authorization,Content-Type` on every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cors;

impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn decorate(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(CorsHandler { next })
    }
}

struct CorsHandler {
    next: BoxHandler,
}

#[async_trait]
impl Handler for CorsHandler {
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        let mut response = self.next.call(req).await?;
        response.insert_header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response.insert_header(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Authorization,Content-Type"));
        Ok(response)
    }
}
