//! Cookie jar carried across attempts and across calls.
//!
//! The jar is a plain name → value mapping. It knows nothing about domains,
//! paths or expiry: every cookie in it is sent with every attempt, which is
//! what a single-site fetch session needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Cookie Jar
// ============================================================================

/// Mapping of cookie name to value.
///
/// Keys are unique and kept sorted, so [`CookieJar::to_header`] renders
/// deterministically. Every merge overwrites existing names with the
/// incoming value, which makes merging the same cookies twice a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw `Cookie` header value such as `"a=1; b=2"`.
    ///
    /// Segments are split on `;`, then on the first `=`. Names and values
    /// are trimmed. Empty segments, segments without `=` and segments with
    /// an empty name are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut jar = Self::new();
        jar.merge_str(raw);
        jar
    }

    /// Builds a jar from the values of `Set-Cookie` response headers.
    ///
    /// Only the leading `name=value` pair of each header is kept; attributes
    /// like `Path` or `HttpOnly` are dropped.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut jar = Self::new();
        for header in headers {
            if let Some(pair) = header.split(';').next() {
                jar.merge_str(pair);
            }
        }
        jar
    }

    /// Sets one cookie, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Merges a raw `"k=v; k2=v2"` string into the jar.
    pub fn merge_str(&mut self, raw: &str) {
        for segment in raw.split(';') {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            self.cookies.insert(name.to_string(), value.trim().to_string());
        }
    }

    /// Merges another jar into this one; incoming values win.
    pub fn merge(&mut self, other: &CookieJar) {
        for (name, value) in &other.cookies {
            self.cookies.insert(name.clone(), value.clone());
        }
    }

    /// Returns a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns true if a cookie with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Returns true if every cookie in `other` is present here with the same value.
    pub fn is_superset_of(&self, other: &CookieJar) -> bool {
        other
            .cookies
            .iter()
            .all(|(name, value)| self.cookies.get(name) == Some(value))
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the jar is empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the jar as a `Cookie` header value: `"k=v; k2=v2"`.
    pub fn to_header(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieJar {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut jar = Self::new();
        jar.extend(iter);
        jar
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for CookieJar {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl From<BTreeMap<String, String>> for CookieJar {
    fn from(cookies: BTreeMap<String, String>) -> Self {
        Self { cookies }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_pairs() {
        let jar = CookieJar::parse("a=1; b=2; c=3");
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("b"), Some("2"));
        assert_eq!(jar.get("c"), Some("3"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(CookieJar::parse("").is_empty());
        assert!(CookieJar::parse(" ; ;").is_empty());
    }

    #[test]
    fn test_parse_trims_and_keeps_equals_in_value() {
        let jar = CookieJar::parse("  token = abc==  ;flag=;=orphan; junk");
        assert_eq!(jar.get("token"), Some("abc=="));
        assert_eq!(jar.get("flag"), Some(""));
        assert_eq!(jar.len(), 2);
    }

    #[test]
    fn test_merge_overwrites_conflicts() {
        let mut jar = CookieJar::new();
        jar.insert("a", "1");
        jar.merge_str("a=2; b=3");
        assert_eq!(jar.get("a"), Some("2"));
        assert_eq!(jar.get("b"), Some("3"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = CookieJar::parse("a=1; z=9");
        let incoming = CookieJar::parse("a=2; b=3");

        let mut once = base.clone();
        once.merge(&incoming);
        let mut twice = once.clone();
        twice.merge(&incoming);

        assert_eq!(once, twice);
        assert!(once.is_superset_of(&incoming));
        assert!(once.is_superset_of(&CookieJar::parse("z=9")));
        assert!(!once.is_superset_of(&base));
    }

    #[test]
    fn test_from_set_cookie_drops_attributes() {
        let jar = CookieJar::from_set_cookie([
            "sid=abc; Path=/; HttpOnly",
            "cf_clearance=xyz; Max-Age=3600; Secure",
        ]);
        assert_eq!(jar.get("sid"), Some("abc"));
        assert_eq!(jar.get("cf_clearance"), Some("xyz"));
        assert!(!jar.contains("Path"));
    }

    #[test]
    fn test_to_header() {
        let jar: CookieJar = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(jar.to_header(), "a=1; b=2");
        assert_eq!(CookieJar::new().to_header(), "");
    }
}
