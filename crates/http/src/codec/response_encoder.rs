//! HTTP response encoder
//!
//! Serializes a [`Response`] into raw bytes. The status line is followed by the
//! reserved headers in a fixed order, whatever the handler put into the header
//! map for them:
//!
//! ```text
//! HTTP/1.1 {code} {reason}
//! Date: {RFC 1123 date}
//! Server: {server name}
//! Content-Type: {content type}
//! Content-Length: {body length}
//! Connection: close
//! ```
//!
//! Every other header is written afterwards, then an empty line and the body.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, DATE, SERVER, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue};
use tokio_util::codec::Encoder;

use crate::date::DateService;
use crate::protocol::{DEFAULT_CONTENT_TYPE, DEFAULT_SERVER_NAME, Response, SendError, reason_phrase};

/// Initial buffer size allocated for the status line and headers
const INIT_HEADER_SIZE: usize = 512;

/// Headers the encoder always writes itself.
static RESERVED_HEADERS: [HeaderName; 6] = [DATE, SERVER, CONTENT_TYPE, CONTENT_LENGTH, CONNECTION, TRANSFER_ENCODING];

#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    server_name: HeaderValue,
}

impl ResponseEncoder {
    pub fn new(server_name: HeaderValue) -> Self {
        Self { server_name }
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new(HeaderValue::from_static(DEFAULT_SERVER_NAME))
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    /// # Errors
    ///
    /// Returns [`SendError::InvalidResponse`] when the content type contains CR or LF,
    /// which would let a handler inject header lines.
    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let content_type = match item.content_type().trim() {
            "" => DEFAULT_CONTENT_TYPE,
            content_type => content_type,
        };
        if content_type.contains(['\r', '\n']) {
            return Err(SendError::invalid_response("content type contains a line break"));
        }

        let body = item.body();
        dst.reserve(INIT_HEADER_SIZE + body.len());

        let status = item.status();
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), reason_phrase(status))?;

        DateService::global().with_http_date(|date| {
            put_header(dst, b"Date", date.as_bytes());
        });
        put_header(dst, b"Server", self.server_name.as_bytes());
        put_header(dst, b"Content-Type", content_type.as_bytes());
        write!(FastWrite(dst), "Content-Length: {}\r\n", body.len())?;
        put_header(dst, b"Connection", b"close");

        for (name, value) in item.headers() {
            if RESERVED_HEADERS.contains(name) {
                continue;
            }
            put_header(dst, name.as_ref(), value.as_bytes());
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(body);
        Ok(())
    }
}

fn put_header(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// Writer that appends straight into a `BytesMut`, used with `write!`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH};

    fn encode(response: Response) -> String {
        let mut buf = BytesMut::new();
        ResponseEncoder::default().encode(response, &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn writes_reserved_headers_in_order() {
        let output = encode(Response::text(StatusCode::OK, "pong"));
        let lines: Vec<&str> = output.split("\r\n").collect();

        assert_eq!(lines[0], "HTTP/1.1 200 OK");
        assert!(lines[1].starts_with("Date: ") && lines[1].ends_with(" GMT"));
        assert_eq!(lines[2], "Server: mini-boot");
        assert_eq!(lines[3], "Content-Type: text/plain; charset=utf-8");
        assert_eq!(lines[4], "Content-Length: 4");
        assert_eq!(lines[5], "Connection: close");
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "pong");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn reserved_headers_from_handler_are_not_duplicated() {
        let mut response = Response::text(StatusCode::OK, "abc").with_header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response.insert_header(CONTENT_LENGTH, HeaderValue::from_static("999"));
        response.insert_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let output = encode(response);

        assert_eq!(output.matches("Content-Length").count(), 1);
        assert!(output.contains("Content-Length: 3\r\n"));
        assert!(!output.to_ascii_lowercase().contains("transfer-encoding"));
        assert!(!output.contains("content-length"));
        assert!(output.contains("access-control-allow-origin: *\r\n"));
        assert!(output.ends_with("\r\n\r\nabc"));
    }

    #[test]
    fn unknown_status_uses_ok_reason() {
        let output = encode(Response::empty(StatusCode::IM_A_TEAPOT));
        assert!(output.starts_with("HTTP/1.1 418 OK\r\n"));
        assert!(output.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn configured_server_name() {
        let mut buf = BytesMut::new();
        ResponseEncoder::new(HeaderValue::from_static("clinic")).encode(Response::empty(StatusCode::NO_CONTENT), &mut buf).unwrap();

        let output = String::from_utf8(buf.to_vec()).unwrap();
        assert!(output.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(output.contains("Server: clinic\r\n"));
    }

    #[test]
    fn line_break_in_content_type_is_rejected() {
        let response = Response::new(StatusCode::OK, "text/plain\r\nX-Evil: 1", "x");
        let error = ResponseEncoder::default().encode(response, &mut BytesMut::new()).unwrap_err();

        assert!(matches!(error, SendError::InvalidResponse { .. }));
    }
}
