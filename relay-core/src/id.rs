use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque correlation token linking a request to its response.
///
/// The backend chooses the representation. Sequential integers and UUIDs
/// are both common, so the token is stored as a string and compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct RequestId(pub String);

impl RequestId {
    /// Creates a `RequestId` from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new random `RequestId` backed by a v4 UUID.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A normalised route path.
///
/// Leading slashes are stripped, so `"/ping"`, `"//ping"` and `"ping"` all
/// name the same route. The stored form never starts with `/`, is never
/// empty and contains no whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePath(String);

impl RoutePath {
    /// Parses and normalises a raw path.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidRoutePath`] if the path is empty after
    /// stripping leading slashes, or contains whitespace or control characters.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(CoreError::InvalidRoutePath {
                path: raw.to_owned(),
                reason: "path is empty".to_owned(),
            });
        }
        if let Some(c) = trimmed.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidRoutePath {
                path: raw.to_owned(),
                reason: format!("contains disallowed character {c:?}"),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the normalised path, without a leading slash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl TryFrom<String> for RoutePath {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for RoutePath {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl std::str::FromStr for RoutePath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<RoutePath> for String {
    fn from(path: RoutePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_path_strips_leading_slashes() {
        let a = RoutePath::parse("/ping").unwrap_or_else(|e| panic!("parse failed: {e}"));
        let b = RoutePath::parse("ping").unwrap_or_else(|e| panic!("parse failed: {e}"));
        let c = RoutePath::parse("///ping").unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "ping");
    }

    #[test]
    fn route_path_keeps_inner_slashes() {
        let path = RoutePath::parse("/decks/list").unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(path.as_str(), "decks/list");
        assert_eq!(path.to_string(), "/decks/list");
    }

    #[test]
    fn route_path_rejects_empty_and_bare_slash() {
        assert!(matches!(RoutePath::parse(""), Err(CoreError::InvalidRoutePath { .. })));
        assert!(matches!(RoutePath::parse("/"), Err(CoreError::InvalidRoutePath { .. })));
    }

    #[test]
    fn route_path_rejects_whitespace() {
        let err = match RoutePath::parse("/bad path") {
            Err(e) => e,
            Ok(p) => panic!("expected rejection, got {p}"),
        };
        assert!(err.to_string().contains("bad path"), "error must name the raw path");
    }

    #[test]
    fn request_id_from_integer_matches_string_form() {
        assert_eq!(RequestId::from(42_u64), RequestId::from("42"));
    }

    #[test]
    fn request_id_random_is_unique() {
        assert_ne!(RequestId::random(), RequestId::random());
    }

    proptest::proptest! {
        #[test]
        fn proptest_route_path_normalisation_is_idempotent(
            slashes in 0..4usize,
            tail in "[a-z0-9_-]{1,12}(/[a-z0-9_-]{1,12}){0,3}",
        ) {
            let raw = format!("{}{tail}", "/".repeat(slashes));
            let once = RoutePath::parse(&raw);
            proptest::prop_assert!(once.is_ok(), "well-formed path must parse");
            if let Ok(once) = once {
                proptest::prop_assert_eq!(once.as_str(), tail.as_str());
                let twice = RoutePath::parse(&once.to_string());
                proptest::prop_assert_eq!(twice.ok(), Some(once));
            }
        }
    }

    #[test]
    fn route_path_deserialization_normalises() {
        let path: RoutePath = match serde_json::from_str("\"/ping\"") {
            Ok(p) => p,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        assert_eq!(path.as_str(), "ping");
        assert!(serde_json::from_str::<RoutePath>("\"/\"").is_err());
    }
}
