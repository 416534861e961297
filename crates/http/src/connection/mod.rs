//! HTTP connection handling module
//!
//! [`HttpConnection`] owns the two halves of one accepted socket and performs a
//! single request/response exchange on them: decode, dispatch, encode, close.
//! The limits it enforces come from [`ConnectionConfig`].

mod http_connection;

pub use http_connection::ConnectionConfig;
pub use http_connection::HttpConnection;
