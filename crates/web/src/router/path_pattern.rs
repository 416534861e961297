//! Route templates such as `/doctors/{id}/visits`.
//!
//! A template is normalized the same way request paths are, then split into
//! [`Segment`]s. A segment written as `{name}` captures any non-empty path
//! segment under `name`; every other segment must match literally.

use miniboot_http::protocol::normalize_path;

use crate::router::PathParams;

const STATIC_SCORE: u32 = 100;
const VARIABLE_SCORE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Static,
    Variable,
}

/// One `/`-delimited token of a template. For a variable the token is the capture name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    kind: SegmentKind,
    token: String,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            Some(name) => Self { kind: SegmentKind::Variable, token: name.to_string() },
            None => Self { kind: SegmentKind::Static, token: raw.to_string() },
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// A compiled route template.
///
/// Matching is exact on the number of segments and case-sensitive on static
/// segments. A pattern without segments matches only `/`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(template: &str) -> Self {
        let template = normalize_path(template).into_owned();
        let segments = path_segments(&template).map(Segment::parse).collect();
        Self { template, segments }
    }

    /// The normalized template.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut values = path_segments(path);
        let all_match = self.segments.iter().all(|segment| match values.next() {
            Some(value) => segment.kind == SegmentKind::Variable || segment.token == value,
            None => false,
        });
        all_match && values.next().is_none()
    }

    /// Extracts the variable segments of a matching path, percent-decoded.
    ///
    /// Returns `None` when the path does not match. If a name occurs twice in
    /// the template, the value of the last occurrence is kept. A value that is
    /// not valid percent-encoded UTF-8 is kept as received.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        if !self.matches(path) {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, value) in self.segments.iter().zip(path_segments(path)) {
            if segment.kind == SegmentKind::Variable {
                let value = urlencoding::decode(value).map_or_else(|_| value.to_string(), |decoded| decoded.into_owned());
                params.insert(segment.token.clone(), value);
            }
        }
        Some(params)
    }

    /// Specificity: 100 per static segment plus 10 per variable segment.
    pub fn score(&self) -> u32 {
        self.segments
            .iter()
            .map(|segment| match segment.kind {
                SegmentKind::Static => STATIC_SCORE,
                SegmentKind::Variable => VARIABLE_SCORE,
            })
            .sum()
    }
}

/// Splits a path into its non-empty segments. Anything from a `?` or `#`
/// inside a segment onwards is dropped, which also normalizes the path.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim()
        .split('/')
        .map(|segment| segment.find(['?', '#']).map_or(segment, |end| &segment[..end]))
        .filter(|segment| !segment.is_empty())
}
