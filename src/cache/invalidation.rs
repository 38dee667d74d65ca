//! Invalidation Controller
//!
//! Marks cached scopes stale after successful mutations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{ReadCache, Tag};

// == Scope ==
/// Which entries an invalidation covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum Scope {
    /// Entries tagged with exactly this tag
    Exact(Tag),
    /// Entries tagged with this tag or any descendant of it
    Subtree(Tag),
}

impl Scope {
    pub fn exact(tag: impl Into<Tag>) -> Self {
        Scope::Exact(tag.into())
    }

    pub fn subtree(tag: impl Into<Tag>) -> Self {
        Scope::Subtree(tag.into())
    }

    pub fn tag(&self) -> &Tag {
        match self {
            Scope::Exact(tag) | Scope::Subtree(tag) => tag,
        }
    }

    /// True if an entry carrying `tag` falls under this scope.
    pub fn covers(&self, tag: &Tag) -> bool {
        match self {
            Scope::Exact(scope) => tag == scope,
            Scope::Subtree(scope) => tag.is_within(scope),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Exact(tag) => write!(f, "{}", tag),
            Scope::Subtree(tag) => write!(f, "{}/**", tag),
        }
    }
}

// == Invalidator ==
/// Invalidation Controller bound to one read cache.
///
/// Callers must only signal after the mutation is durably applied; see
/// `RequestContext::mutate`, which enforces that order.
#[derive(Clone)]
pub struct Invalidator {
    cache: Arc<ReadCache>,
}

impl Invalidator {
    pub fn new(cache: Arc<ReadCache>) -> Self {
        Self { cache }
    }

    // == Invalidate ==
    /// Marks every entry under `scope` stale. Idempotent.
    ///
    /// Returns the number of entries removed; 0 for unknown or already
    /// invalidated tags.
    pub fn invalidate(&self, scope: &Scope) -> usize {
        let removed = self.cache.invalidate(scope);
        if removed > 0 {
            info!(scope = %scope, removed, "Invalidated cached reads");
        } else {
            debug!(scope = %scope, "Invalidation matched no entries");
        }
        removed
    }

    pub fn invalidate_tag(&self, tag: impl Into<Tag>) -> usize {
        self.invalidate(&Scope::Exact(tag.into()))
    }

    pub fn invalidate_subtree(&self, tag: impl Into<Tag>) -> usize {
        self.invalidate(&Scope::Subtree(tag.into()))
    }

    /// Signals that a mutation has been persisted and fans out its scopes.
    pub fn on_mutation_success(&self, scopes: &[Scope]) -> usize {
        scopes.iter().map(|scope| self.invalidate(scope)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryKey;
    use crate::error::CacheError;

    async fn fill(cache: &ReadCache, key: &str, tag: &str) {
        cache
            .get(QueryKey::new(key), &[Tag::new(tag)], || async move {
                Ok::<_, CacheError>(key.len())
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_scope_covers() {
        let exact = Scope::exact("archive");
        assert!(exact.covers(&Tag::new("archive")));
        assert!(!exact.covers(&Tag::new("archive/2024")));

        let subtree = Scope::subtree("archive");
        assert!(subtree.covers(&Tag::new("archive/2024/05")));
        assert!(!subtree.covers(&Tag::new("messages")));
    }

    #[test]
    fn test_scope_serde() {
        let scope: Scope = serde_json::from_str(r#"{"kind":"subtree","tag":"/archive"}"#).unwrap();
        assert_eq!(scope, Scope::subtree("archive"));
        assert_eq!(scope.to_string(), "/archive/**");
    }

    #[tokio::test]
    async fn test_subtree_invalidation_covers_descendants_only() {
        let cache = Arc::new(ReadCache::default());
        fill(&cache, "archive:years", "archive").await;
        fill(&cache, "archive:year:2024", "archive/2024").await;
        fill(&cache, "archive:month:2024:05", "archive/2024/05").await;
        fill(&cache, "all-messages", "messages").await;

        let invalidator = Invalidator::new(Arc::clone(&cache));
        assert_eq!(invalidator.invalidate_subtree("archive"), 3);

        assert!(!cache.contains(&QueryKey::new("archive:years")));
        assert!(!cache.contains(&QueryKey::new("archive:year:2024")));
        assert!(!cache.contains(&QueryKey::new("archive:month:2024:05")));
        assert!(cache.contains(&QueryKey::new("all-messages")));
    }

    #[tokio::test]
    async fn test_exact_invalidation_leaves_children() {
        let cache = Arc::new(ReadCache::default());
        fill(&cache, "archive:years", "archive").await;
        fill(&cache, "archive:year:2024", "archive/2024").await;

        let invalidator = Invalidator::new(Arc::clone(&cache));
        assert_eq!(invalidator.invalidate_tag("archive"), 1);
        assert!(cache.contains(&QueryKey::new("archive:year:2024")));
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let cache = Arc::new(ReadCache::default());
        fill(&cache, "all-messages", "messages").await;

        let invalidator = Invalidator::new(Arc::clone(&cache));
        assert_eq!(invalidator.invalidate_tag("messages"), 1);
        assert_eq!(invalidator.invalidate_tag("messages"), 0);
        assert_eq!(invalidator.invalidate_tag("never-used"), 0);
        assert_eq!(cache.stats().invalidated, 1);
    }

    #[tokio::test]
    async fn test_on_mutation_success_fans_out() {
        let cache = Arc::new(ReadCache::default());
        fill(&cache, "news:all", "news").await;
        fill(&cache, "news:item:first", "news/first").await;
        fill(&cache, "archive:years", "archive").await;

        let invalidator = Invalidator::new(Arc::clone(&cache));
        let removed =
            invalidator.on_mutation_success(&[Scope::subtree("news"), Scope::subtree("archive")]);
        assert_eq!(removed, 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_root_subtree_clears_everything() {
        let cache = Arc::new(ReadCache::default());
        fill(&cache, "all-messages", "messages").await;
        fill(&cache, "posts:2", "feed").await;

        let invalidator = Invalidator::new(Arc::clone(&cache));
        assert_eq!(invalidator.invalidate(&Scope::Subtree(Tag::root())), 2);
    }
}
