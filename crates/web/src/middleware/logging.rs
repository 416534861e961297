use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use miniboot_http::handler::{BoxHandler, Handler, HandlerError};
use miniboot_http::protocol::{Request, Response};
use tracing::info;

use crate::middleware::Middleware;

/// Logs `METHOD PATH -> STATUS DURATIONms` once per request. The response is not touched.
///
/// A failure passing through is logged with the status it maps to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

impl Middleware for Logging {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn decorate(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(LoggingHandler { next })
    }
}

struct LoggingHandler {
    next: BoxHandler,
}

#[async_trait]
impl Handler for LoggingHandler {
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        let method = req.method().clone();
        let path = req.path().to_string();
        let start = Instant::now();

        let result = self.next.call(req).await;

        let status = match &result {
            Ok(response) => response.status(),
            Err(e) => e.status(),
        };
        info!("{method} {path} -> {} {}ms", status.as_u16(), start.elapsed().as_millis());
        result
    }
}
