//! Captured route parameters
//!
//! Captures are stored in pattern order, inline for typical routes (up to
//! eight placeholders) and on the heap beyond that.

use smallvec::SmallVec;

/// Maximum number of inline path parameters before heap allocation.
pub const INLINE_PARAM_COUNT: usize = 8;

/// Ordered placeholder name → captured value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: SmallVec<[(String, String); INLINE_PARAM_COUNT]>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SmallVec::with_capacity(capacity),
        }
    }

    /// Append a capture. Names are unique per pattern, so an existing entry
    /// is overwritten in place rather than duplicated.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_order() {
        let params: RouteParams = [("year", "2024"), ("month", "05"), ("slug", "hello")]
            .into_iter()
            .collect();
        let names: Vec<&str> = params.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["year", "month", "slug"]);
    }

    #[test]
    fn test_get() {
        let mut params = RouteParams::new();
        params.push("id", "42");
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_push_overwrites() {
        let mut params = RouteParams::new();
        params.push("id", "1");
        params.push("id", "2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let params: RouteParams = (0..12).map(|i| (format!("p{}", i), i.to_string())).collect();
        assert_eq!(params.len(), 12);
        assert_eq!(params.get("p11"), Some("11"));
        assert_eq!(params.iter().last(), Some(("p11", "11")));
    }
}
