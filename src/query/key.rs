use std::fmt;

/// Structural identifier for a cacheable query.
///
/// A key is an ordered list of segments; two keys are equal iff their
/// segments are equal. Keys form a hierarchy through their prefixes, which is
/// what invalidation operates on: invalidating `["events"]` covers
/// `["events", "list"]` and `["events", "slug", "rustconf"]` alike.
///
/// # Example
///
/// ```rust
/// use marquee::query::QueryKey;
///
/// let list = QueryKey::new(["events", "list"]);
/// let detail = QueryKey::new(["events"]).push("slug").push("rustconf");
///
/// assert!(list.starts_with(&QueryKey::new(["events"])));
/// assert!(!list.starts_with(&detail));
/// assert_eq!(detail.to_string(), "events:slug:rustconf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Creates a key from ordered segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Appends a segment, consuming the key.
    #[must_use]
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Returns `true` if this key begins with every segment of `prefix`.
    ///
    /// Every key starts with the empty key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The ordered segments of the key.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

impl From<&str> for QueryKey {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_string()])
    }
}

impl From<String> for QueryKey {
    fn from(segment: String) -> Self {
        Self(vec![segment])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = QueryKey::new(["events", "list"]);
        let b = QueryKey::new(["events"]).push("list");
        assert_eq!(a, b);

        let c = QueryKey::new(["events", "detail"]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_segment_order_matters() {
        let a = QueryKey::new(["events", "list"]);
        let b = QueryKey::new(["list", "events"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_matching() {
        let key = QueryKey::new(["events", "list", "category=music"]);

        assert!(key.starts_with(&QueryKey::new(["events"])));
        assert!(key.starts_with(&QueryKey::new(["events", "list"])));
        assert!(key.starts_with(&key.clone()));
        assert!(key.starts_with(&QueryKey::new(Vec::<String>::new())));

        assert!(!key.starts_with(&QueryKey::new(["users"])));
        assert!(!key.starts_with(&key.clone().push("extra")));
    }

    #[test]
    fn test_display_joins_segments() {
        let key = QueryKey::new(["events", "slug", "rustconf"]);
        assert_eq!(key.to_string(), "events:slug:rustconf");
    }

    #[test]
    fn test_from_single_segment() {
        let key: QueryKey = "events".into();
        assert_eq!(key.segments(), ["events"]);
    }
}
