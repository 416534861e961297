//! Routing metadata attached to a request's extensions.

use miniboot_http::protocol::Request;
use serde::{Serialize, Serializer};

/// Values captured by the variable segments of the matched route, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    /// Sets `name`, replacing an earlier value in place.
    pub fn insert(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(existing, _)| existing == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Whether the matched route requires authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Protected(pub bool);

/// Access to the routing metadata of a dispatched request.
pub trait RequestExt {
    /// The captured path parameters. Empty when the request was not routed.
    fn path_params(&self) -> &PathParams;

    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params().get(name)
    }

    fn is_protected(&self) -> bool;
}

static EMPTY_PARAMS: PathParams = PathParams { entries: Vec::new() };

impl RequestExt for Request {
    fn path_params(&self) -> &PathParams {
        self.extensions().get::<PathParams>().unwrap_or(&EMPTY_PARAMS)
    }

    fn is_protected(&self) -> bool {
        self.extensions().get::<Protected>().is_some_and(|protected| protected.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut params = PathParams::default();
        params.insert("id".into(), "1".into());
        params.insert("name".into(), "a".into());
        params.insert("id".into(), "2".into());

        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("id", "2"), ("name", "a")]);
    }

    #[test]
    fn serializes_as_object() {
        let mut params = PathParams::default();
        params.insert("id".into(), "7".into());

        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"id":"7"}"#);
    }

    #[test]
    fn unrouted_request_has_no_metadata() {
        let mut request = Request::builder().build();
        assert!(request.path_params().is_empty());
        assert!(!request.is_protected());

        request.extensions_mut().insert(Protected(true));
        assert!(request.is_protected());
    }
}
