use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use miniboot_http::handler::{BoxHandler, Handler, HandlerError};
use miniboot_http::protocol::{Request, Response, reason_phrase};
use serde::Serialize;
use tracing::{error, warn};

use crate::middleware::Middleware;

/// Converts every failure of the wrapped handler into a JSON error response.
///
/// The body is `{"error": <reason>, "message": <reason>}` where `<reason>` is
/// the reason phrase of the status. Error details are logged, never sent to
/// the client. Panics are answered with a 500.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandle;

impl Middleware for ErrorHandle {
    fn name(&self) -> &'static str {
        "error_handle"
    }

    fn decorate(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(ErrorHandleHandler { next })
    }
}

struct ErrorHandleHandler {
    next: BoxHandler,
}

#[async_trait]
impl Handler for ErrorHandleHandler {
    async fn call(&self, req: Request) -> Result<Response, HandlerError> {
        match AssertUnwindSafe(self.next.call(req)).catch_unwind().await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                let status = e.status();
                if status.is_server_error() {
                    error!(cause = %e, "handler failed");
                } else {
                    warn!(%status, cause = %e, "request rejected");
                }
                Ok(error_response(status))
            }
            Err(panic) => {
                error!(cause = panic_message(panic.as_ref()), "handler panicked");
                Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

pub(crate) fn error_response(status: StatusCode) -> Response {
    let reason = reason_phrase(status);
    let body = ErrorBody { error: reason, message: reason };
    // two string fields always serialize
    let body = serde_json::to_vec(&body).unwrap_or_default();
    Response::new(status, mime::APPLICATION_JSON.as_ref(), body)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniboot_http::handler::handler_fn;
    use serde_json::{Value, json};

    async fn call<H: Handler + 'static>(handler: H) -> Response {
        ErrorHandle.decorate(Arc::new(handler)).call(Request::builder().build()).await.unwrap()
    }

    async fn parse_json(req: Request) -> Result<Response, HandlerError> {
        let value: Value = serde_json::from_slice(req.body())?;
        Response::json(StatusCode::OK, &value)
    }

    fn json_body(response: &Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn passes_successful_response_through() {
        let response = call(handler_fn(|_req: Request| async { Ok(Response::text(StatusCode::CREATED, "made")) })).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(&response.body()[..], b"made");
    }

    #[tokio::test]
    async fn bad_request_becomes_400_json() {
        let handler = ErrorHandle.decorate(Arc::new(handler_fn(parse_json)));
        let response = handler.call(Request::builder().body("{broken").build()).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(json_body(&response), json!({"error": "Bad Request", "message": "Bad Request"}));
    }

    #[tokio::test]
    async fn routing_errors_keep_their_status() {
        let response = call(handler_fn(|_req: Request| async { Err::<Response, _>(HandlerError::MethodNotAllowed) })).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(&response)["error"], "Method Not Allowed");

        let response = call(handler_fn(|_req: Request| async { Err::<Response, _>(HandlerError::NotFound) })).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let response =
            call(handler_fn(|_req: Request| async { Err::<Response, _>(HandlerError::internal("password=hunter2 at db.rs:42")) })).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = std::str::from_utf8(response.body()).unwrap();
        assert!(!body.contains("hunter2"));
        assert_eq!(json_body(&response)["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn panic_becomes_500_json() {
        let response = call(handler_fn(|_req: Request| async {
            if true {
                panic!("index out of bounds");
            }
            Ok(Response::empty(StatusCode::OK))
        }))
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(&response)["error"], "Internal Server Error");
    }
}
