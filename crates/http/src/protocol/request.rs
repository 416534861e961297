//! HTTP request value type.
//!
//! A [`Request`] is produced once per connection by the
//! [`RequestDecoder`](crate::codec::RequestDecoder) and then handed by value
//! through the middleware chain to the terminal handler. It is never shared
//! between connections.

use std::borrow::Cow;

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};

/// A fully buffered HTTP/1.1 request.
///
/// Invariants:
/// - header names are lower-case (guaranteed by [`HeaderName`]), duplicates keep the last value
/// - [`path`](Request::path) always starts with `/` and never ends with `/` unless it is `/`
/// - the body is empty, never absent, when the request carried no `Content-Length`
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    raw_path: String,
    http_version: String,
    headers: HeaderMap,
    query: QueryParams,
    body: Bytes,
    extensions: Extensions,
}

impl Request {
    /// Creates a request from its decoded parts.
    ///
    /// `target` is the request target as it appeared on the request line; the
    /// query string and fragment are split off and the path is normalized.
    pub fn from_parts(method: Method, target: &str, http_version: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        let (raw_path, query) = split_target(target);
        let raw_path = normalize_path(raw_path).into_owned();
        let path = match urlencoding::decode(&raw_path) {
            Ok(decoded) => normalize_path(&decoded).into_owned(),
            Err(_) => raw_path.clone(),
        };

        Self {
            method,
            path,
            raw_path,
            http_version: http_version.into(),
            headers,
            query: QueryParams::parse(query),
            body,
            extensions: Extensions::new(),
        }
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The percent-decoded, normalized path without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The normalized path with percent-escapes left intact. Routing matches against this.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks a header up by name, ignoring case. Returns `None` for values that are not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name.to_ascii_lowercase().as_str()).and_then(|value| value.to_str().ok())
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Per-request metadata attached by the routing layer.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Normalizes a path: collapses repeated slashes, forces a leading slash and
/// strips the trailing slash unless the whole path is `/`.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let trimmed = path.trim();
    let already_normal = trimmed.starts_with('/')
        && !trimmed.contains("//")
        && (trimmed.len() == 1 || !trimmed.ends_with('/'))
        && trimmed.len() == path.len();
    if already_normal {
        return Cow::Borrowed(path);
    }

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    for segment in trimmed.split('/').filter(|segment| !segment.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    Cow::Owned(normalized)
}

fn split_target(target: &str) -> (&str, &str) {
    let target = target.split('#').next().unwrap_or_default();
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// Query parameters keyed by name, keeping the order in which keys first appeared
/// and every value given for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Parses an `application/x-www-form-urlencoded` query string. Empty pairs are skipped,
    /// a key without `=` gets an empty value.
    pub fn parse(query: &str) -> Self {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default();

        let mut params = Self::default();
        for (key, value) in pairs {
            params.append(key, value);
        }
        params
    }

    fn append(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// The first value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries.iter().find(|(existing, _)| existing == key).map_or(&[], |(_, values)| values.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Public factory for [`Request`], mostly useful for tests and in-process dispatch.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    target: String,
    http_version: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    fn new() -> Self {
        Self { method: Method::GET, target: "/".into(), http_version: "HTTP/1.1".into(), headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request::from_parts(self.method, &self.target, self.http_version, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path("doctors"), "/doctors");
        assert_eq!(normalize_path("/doctors/"), "/doctors");
        assert_eq!(normalize_path("//doctors///7//"), "/doctors/7");
        assert!(matches!(normalize_path("/doctors/7"), Cow::Borrowed(_)));
    }

    #[test]
    fn target_is_split_into_path_and_query() {
        let request = Request::builder().target("/patients/?id=7&name=a%20b&id=8#top").build();

        assert_eq!(request.path(), "/patients");
        assert_eq!(request.query().get("id"), Some("7"));
        assert_eq!(request.query().get_all("id"), ["7".to_string(), "8".to_string()]);
        assert_eq!(request.query().get("name"), Some("a b"));
        assert_eq!(request.query().keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn query_keeps_first_seen_key_order() {
        let query = QueryParams::parse("b=1&a=2&&b=3&flag");

        assert_eq!(query.len(), 3);
        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["b", "a", "flag"]);
        assert_eq!(query.get_all("b"), ["1".to_string(), "3".to_string()]);
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("missing"), None);
        assert!(query.get_all("missing").is_empty());
    }

    #[test]
    fn path_is_decoded_but_raw_path_is_not() {
        let request = Request::builder().target("/files/a%20b/").build();

        assert_eq!(request.path(), "/files/a b");
        assert_eq!(request.raw_path(), "/files/a%20b");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = Request::builder()
            .header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body("{}")
            .build();

        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
        assert_eq!(request.body_text(), "{}");
    }

    #[test]
    fn body_defaults_to_empty() {
        let request = Request::builder().method(Method::DELETE).target("/x").build();

        assert!(request.body().is_empty());
        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(request.http_version(), "HTTP/1.1");
    }
}
