//! Segment-wise path prefix patterns.

/// A route prefix such as `/api/conversations` or `/api/conversations/*/messages`.
///
/// Matching is by whole path segments: `/api/contacts` matches
/// `/api/contacts` and `/api/contacts/42` but not `/api/contactsearch`.
/// A `*` segment matches exactly one arbitrary segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
}

impl PathPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = split(&raw)
            .map(|s| {
                if s == "*" {
                    Segment::Any
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split(path);
        self.segments.iter().all(|seg| match (seg, parts.next()) {
            (Segment::Literal(lit), Some(part)) => lit == part,
            (Segment::Any, Some(_)) => true,
            (_, None) => false,
        })
    }

    /// Ordering key for longest-prefix selection: more segments first, then
    /// more literal segments.
    pub fn specificity(&self) -> (usize, usize) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        (self.segments.len(), literals)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
