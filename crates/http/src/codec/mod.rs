//! HTTP codec module for decoding requests and encoding responses
//!
//! Both halves plug into [`tokio_util::codec`]: the connection wraps the read
//! half of a socket in a `FramedRead<_, RequestDecoder>` and the write half in
//! a `FramedWrite<_, ResponseEncoder>`.
//!
//! - [`RequestDecoder`]: line-oriented state machine producing one fully
//!   buffered [`Request`](crate::protocol::Request)
//! - [`ResponseEncoder`]: writes the status line, the reserved headers in a
//!   fixed order, the remaining headers and the body
//!
//! # Example
//!
//! ```
//! use miniboot_http::codec::{RequestDecoder, ResponseEncoder};
//! use miniboot_http::protocol::Response;
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//! use http::StatusCode;
//!
//! let mut decoder = RequestDecoder::new(1024);
//! let mut request_buffer = BytesMut::from("GET /ping HTTP/1.1\r\n\r\n");
//! let request = decoder.decode(&mut request_buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/ping");
//!
//! let mut encoder = ResponseEncoder::default();
//! let mut response_buffer = BytesMut::new();
//! encoder.encode(Response::text(StatusCode::OK, "pong"), &mut response_buffer).unwrap();
//! assert!(response_buffer.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod line;
mod request_decoder;
mod response_encoder;

pub use request_decoder::{MAX_HEAD_BYTES, RequestDecoder};
pub use response_encoder::ResponseEncoder;
