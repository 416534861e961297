//! The HTTP/1.1 wire layer of mini-boot
//!
//! This crate turns bytes from an accepted socket into a [`protocol::Request`],
//! hands it to a [`handler::Handler`] and writes the resulting
//! [`protocol::Response`] back. Every connection carries exactly one exchange
//! and is closed afterwards.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use miniboot_http::connection::{ConnectionConfig, HttpConnection};
//! use miniboot_http::handler::{HandlerError, handler_fn};
//! use miniboot_http::protocol::{Request, Response};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(handler_fn(hello_world));
//!     let config = ConnectionConfig::default();
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         let config = config.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer, &config).process(handler).await {
//!                 info!(cause = %e, "connection finished with error");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request) -> Result<Response, HandlerError> {
//!     info!(path = request.path(), "request received");
//!     Ok(Response::text(StatusCode::OK, "Hello World!"))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the request decoder and response encoder state machines
//! - [`connection`]: drives one exchange on an accepted socket
//! - [`handler`]: the [`handler::Handler`] trait and [`handler::HandlerError`]
//! - [`protocol`]: request, response and error types
//! - [`date`]: cached `Date` header values
//!
//! # Limitations
//!
//! - HTTP/1.1 only, no keep-alive and no pipelining
//! - bodies must be framed by `Content-Length`; chunked requests are rejected
//! - request line plus headers are limited to 32 KiB

pub mod codec;
pub mod connection;
pub mod date;
pub mod handler;
pub mod protocol;

mod utils;
