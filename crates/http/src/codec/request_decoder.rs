//! HTTP request decoder module
//!
//! This module decodes one HTTP/1.1 request from a byte stream using a
//! streaming state machine driven by [`tokio_util::codec::FramedRead`].
//!
//! # States
//!
//! 1. `RequestLine`: waits for the first line and splits it into method, target and version
//! 2. `Headers`: consumes `Name: value` lines until an empty line
//! 3. `Body`: waits until exactly `Content-Length` bytes are buffered
//!
//! Lines end with CRLF or a bare LF. A `\r` that is not directly followed by
//! `\n` is kept as a literal character. Chunked bodies are rejected outright.
//!
//! # Example
//!
//! ```
//! use miniboot_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new(1024);
//! let mut buffer = BytesMut::from("POST /echo HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(&request.body()[..], b"hi");
//! ```

use std::mem;

use bytes::BytesMut;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::line::take_line;
use crate::protocol::{ParseError, Request};
use crate::utils::ensure;

/// Maximum size in bytes of the request line plus all header lines
pub const MAX_HEAD_BYTES: usize = 32 * 1024;

/// A decoder for HTTP requests with `Content-Length` framed bodies.
#[derive(Debug)]
pub struct RequestDecoder {
    max_body_size: usize,
    state: DecodeState,
}

#[derive(Debug, Default)]
enum DecodeState {
    #[default]
    RequestLine,
    Headers(RequestHead),
    Body { head: RequestHead, length: usize },
}

/// Everything before the body.
#[derive(Debug)]
struct RequestHead {
    method: Method,
    target: String,
    version: String,
    headers: HeaderMap,
    head_bytes: usize,
}

impl RequestDecoder {
    /// Creates a decoder rejecting bodies larger than `max_body_size` bytes
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size, state: DecodeState::RequestLine }
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Attempts to decode a request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request including its body
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the bytes violate the framing rules
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match mem::take(&mut self.state) {
                DecodeState::RequestLine => match take_line(src) {
                    Some(line) => {
                        let head = RequestHead::parse(&line)?;
                        ensure!(head.head_bytes <= MAX_HEAD_BYTES, ParseError::too_large_header(head.head_bytes, MAX_HEAD_BYTES));
                        trace!(method = %head.method, target = %head.target, "parsed request line");
                        self.state = DecodeState::Headers(head);
                    }
                    None => {
                        ensure!(src.len() <= MAX_HEAD_BYTES, ParseError::too_large_header(src.len(), MAX_HEAD_BYTES));
                        return Ok(None);
                    }
                },

                DecodeState::Headers(mut head) => match take_line(src) {
                    Some(line) if line.is_empty() => {
                        let length = body_length(&head.headers, self.max_body_size)?;
                        trace!(body_size = length, "parsed request head");
                        self.state = DecodeState::Body { head, length };
                    }
                    Some(line) => {
                        head.head_bytes += line.len();
                        ensure!(head.head_bytes <= MAX_HEAD_BYTES, ParseError::too_large_header(head.head_bytes, MAX_HEAD_BYTES));
                        head.push_header_line(&line)?;
                        self.state = DecodeState::Headers(head);
                    }
                    None => {
                        let current_size = head.head_bytes + src.len();
                        ensure!(current_size <= MAX_HEAD_BYTES, ParseError::too_large_header(current_size, MAX_HEAD_BYTES));
                        self.state = DecodeState::Headers(head);
                        return Ok(None);
                    }
                },

                DecodeState::Body { head, length } => {
                    if src.len() < length {
                        src.reserve(length - src.len());
                        self.state = DecodeState::Body { head, length };
                        return Ok(None);
                    }

                    let body = src.split_to(length).freeze();
                    return Ok(Some(head.into_request(body)));
                }
            }
        }
    }

    /// Called once the peer closed its write side.
    ///
    /// A connection closed before sending a single byte yields `Ok(None)`;
    /// anything else that is not a complete request is a truncation error.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }

        match mem::take(&mut self.state) {
            DecodeState::RequestLine if src.is_empty() => Ok(None),
            DecodeState::RequestLine | DecodeState::Headers(_) => Err(ParseError::unexpected_eof("headers")),
            DecodeState::Body { .. } => Err(ParseError::unexpected_eof("body")),
        }
    }
}

impl RequestHead {
    /// Parses `METHOD SP target SP version`, splitting on the first two whitespace runs.
    fn parse(line: &[u8]) -> Result<Self, ParseError> {
        ensure!(!line.is_empty(), ParseError::EmptyRequestLine);

        let line = String::from_utf8_lossy(line);
        let (method, rest) = split_token(&line).ok_or_else(|| ParseError::malformed_request_line(&line))?;
        let (target, version) = split_token(rest).ok_or_else(|| ParseError::malformed_request_line(&line))?;
        let version = version.trim();
        ensure!(!method.is_empty() && !version.is_empty(), ParseError::malformed_request_line(&line));

        let method =
            Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| ParseError::malformed_request_line(&line))?;

        Ok(Self { method, target: target.to_string(), version: version.to_string(), headers: HeaderMap::new(), head_bytes: line.len() })
    }

    /// Adds one `Name: value` line. Lines without a colon, or with a name or
    /// value that is not a legal header, are skipped rather than rejected.
    ///
    /// The framing headers are the exception: an illegal `Transfer-Encoding`
    /// or `Content-Length` value fails the request, so the body can never be
    /// framed from a header that was silently dropped.
    fn push_header_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let Some(colon) = line.iter().position(|b| *b == b':') else {
            trace!(line = %String::from_utf8_lossy(line), "skip header line without colon");
            return Ok(());
        };

        let name = line[..colon].trim_ascii();
        let value = line[colon + 1..].trim_ascii();
        let Ok(header_value) = HeaderValue::from_bytes(value) else {
            let value = String::from_utf8_lossy(value);
            ensure!(!name.eq_ignore_ascii_case(b"transfer-encoding"), ParseError::unsupported_transfer_encoding(value));
            ensure!(
                !name.eq_ignore_ascii_case(b"content-length"),
                ParseError::bad_content_length(format!("value {value:?} is not a non-negative integer"))
            );
            trace!(line = %String::from_utf8_lossy(line), "skip illegal header line");
            return Ok(());
        };

        match HeaderName::from_bytes(name) {
            Ok(header_name) => {
                self.headers.insert(header_name, header_value);
            }
            Err(_) => trace!(line = %String::from_utf8_lossy(line), "skip illegal header line"),
        }
        Ok(())
    }

    fn into_request(self, body: bytes::Bytes) -> Request {
        Request::from_parts(self.method, &self.target, self.version, self.headers, body)
    }
}

/// Splits off the first whitespace-delimited token, returning it and the rest
/// with leading whitespace removed.
fn split_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    let end = input.find(char::is_whitespace)?;
    Some((&input[..end], input[end..].trim_start()))
}

/// Determines the body length from `Transfer-Encoding` and `Content-Length`.
///
/// Only an absent, blank or `identity` transfer-encoding is accepted.
fn body_length(headers: &HeaderMap, max_body_size: usize) -> Result<usize, ParseError> {
    if let Some(te) = headers.get(TRANSFER_ENCODING) {
        let te = te.as_bytes().trim_ascii();
        ensure!(
            te.is_empty() || te.eq_ignore_ascii_case(b"identity"),
            ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(te))
        );
    }

    let Some(cl_value) = headers.get(CONTENT_LENGTH) else {
        return Ok(0);
    };

    let cl_str = cl_value.to_str().map_err(|_| ParseError::bad_content_length("value can't to_str"))?.trim();
    let length = cl_str.parse::<u64>().map_err(|_| ParseError::bad_content_length(format!("value {cl_str:?} is not a non-negative integer")))?;

    match usize::try_from(length) {
        Ok(length) if length <= max_body_size => Ok(length),
        _ => Err(ParseError::bad_content_length(format!("{length} exceeds the limit {max_body_size}"))),
    }
}
