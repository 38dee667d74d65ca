//! Query Keys and Tags
//!
//! Identifiers for cached reads and the scopes they are invalidated by.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Query Key ==
/// Deterministic identifier of a read: its name plus its arguments.
///
/// `QueryKey::new("post").arg(42)` and `QueryKey::new("post:42")` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Appends an argument, separated by `:`.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(&value.to_string());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// == Tag ==
/// Path-like scope label attached to cache entries.
///
/// Segments are separated by `/`. Leading, trailing and repeated separators
/// are dropped, so `/archive/2024/` and `archive//2024` are the same tag.
/// The empty tag is the root scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw
            .as_ref()
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// The scope covering every tag.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns a child tag one segment below this one.
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        if self.is_root() {
            Tag::new(segment.to_string())
        } else {
            Tag::new(format!("{}/{}", self.0, segment))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this tag is `scope` itself or nested anywhere below it.
    ///
    /// Matching is per segment: `archive-old` is not within `archive`.
    pub fn is_within(&self, scope: &Tag) -> bool {
        if scope.is_root() || self.0 == scope.0 {
            return true;
        }
        self.0
            .strip_prefix(scope.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_key_args() {
        let key = QueryKey::new("post").arg(42);
        assert_eq!(key.as_str(), "post:42");
        assert_eq!(key, QueryKey::from("post:42"));
        assert_ne!(key, QueryKey::new("post").arg(43));
    }

    #[test]
    fn test_tag_normalization() {
        assert_eq!(Tag::new("/archive/2024/"), Tag::new("archive/2024"));
        assert_eq!(Tag::new("archive//2024"), Tag::new("archive/2024"));
        assert!(Tag::new("/").is_root());
        assert_eq!(Tag::new("archive").child(2024).as_str(), "archive/2024");
        assert_eq!(Tag::root().child("feed").as_str(), "feed");
    }

    #[test]
    fn test_is_within() {
        let archive = Tag::new("archive");
        assert!(Tag::new("archive").is_within(&archive));
        assert!(Tag::new("archive/2024").is_within(&archive));
        assert!(Tag::new("archive/2024/05").is_within(&archive));
        assert!(!Tag::new("archive-old").is_within(&archive));
        assert!(!Tag::new("messages").is_within(&archive));
        assert!(!archive.is_within(&Tag::new("archive/2024")));
        assert!(Tag::new("messages").is_within(&Tag::root()));
    }

    #[test]
    fn test_tag_serde() {
        let tag: Tag = serde_json::from_str(r#""/news/first/""#).unwrap();
        assert_eq!(tag.as_str(), "news/first");
        assert_eq!(serde_json::to_string(&tag).unwrap(), r#""news/first""#);
    }
}
