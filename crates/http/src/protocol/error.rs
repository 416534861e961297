use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("no complete request received within {timeout_ms}ms")]
    ReadTimeout { timeout_ms: u128 },
}

/// Framing failures raised while decoding a request.
///
/// Every variant is answered with `400 Bad Request`; none of them is retried.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty request line")]
    EmptyRequestLine,

    #[error("malformed request line: {line:?}")]
    MalformedRequestLine { line: String },

    #[error("transfer-encoding not supported: {value}")]
    UnsupportedTransferEncoding { value: String },

    #[error("bad content-length: {reason}")]
    BadContentLength { reason: String },

    #[error("unexpected end of stream while reading {stage}")]
    UnexpectedEndOfStream { stage: &'static str },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn malformed_request_line<S: ToString>(line: S) -> Self {
        Self::MalformedRequestLine { line: line.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(value: S) -> Self {
        Self::UnsupportedTransferEncoding { value: value.to_string() }
    }

    pub fn bad_content_length<S: ToString>(reason: S) -> Self {
        Self::BadContentLength { reason: reason.to_string() }
    }

    pub fn unexpected_eof(stage: &'static str) -> Self {
        Self::UnexpectedEndOfStream { stage }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_response<S: ToString>(str: S) -> Self {
        Self::InvalidResponse { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
