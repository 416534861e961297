//! Diagnostic handlers every mini-boot server can mount.

use http::StatusCode;
use miniboot_http::handler::HandlerError;
use miniboot_http::protocol::{Request, Response};
use serde_json::json;

/// `{"status":"ok"}`
pub async fn health(_req: Request) -> Result<Response, HandlerError> {
    Response::json(StatusCode::OK, &json!({ "status": "ok" }))
}

pub async fn ping(_req: Request) -> Result<Response, HandlerError> {
    Ok(Response::text(StatusCode::OK, "pong"))
}

/// Answers with the request body and the request's content type.
pub async fn echo(req: Request) -> Result<Response, HandlerError> {
    let content_type = req.header("content-type").unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref()).to_string();
    Ok(Response::new(StatusCode::OK, content_type, req.body().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::CONTENT_TYPE;

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health(Request::builder().build()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn ping_pongs() {
        let response = ping(Request::builder().build()).await.unwrap();
        assert_eq!(&response.body()[..], b"pong");
    }

    #[tokio::test]
    async fn echo_keeps_body_and_content_type() {
        let request = Request::builder().header(CONTENT_TYPE, HeaderValue::from_static("application/xml")).body("<a/>").build();
        let response = echo(request).await.unwrap();

        assert_eq!(response.content_type(), "application/xml");
        assert_eq!(&response.body()[..], b"<a/>");

        let response = echo(Request::builder().body(vec![0_u8, 159, 146, 150]).build()).await.unwrap();
        assert_eq!(response.content_type(), "application/octet-stream");
        assert_eq!(response.body().len(), 4);
    }
}
