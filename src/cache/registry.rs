//! Tag index.
//!
//! Tracks which cache keys carry which tags so invalidation can find the
//! affected entries without scanning the whole table.

use std::collections::{HashMap, HashSet};

use super::key::{QueryKey, Tag};

/// Maps tag → keys carrying it.
///
/// Not synchronized on its own; it lives inside the read cache's table lock.
#[derive(Debug, Default)]
pub struct TagIndex {
    tag_to_keys: HashMap<Tag, HashSet<QueryKey>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key under each of its tags.
    pub fn register(&mut self, key: &QueryKey, tags: &HashSet<Tag>) {
        for tag in tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// Remove a key from each of its tags, dropping tags left empty.
    pub fn unregister(&mut self, key: &QueryKey, tags: &HashSet<Tag>) {
        for tag in tags {
            if let Some(keys) = self.tag_to_keys.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(tag);
                }
            }
        }
    }

    /// Keys carrying exactly `tag`.
    pub fn keys_for_tag(&self, tag: &Tag) -> HashSet<QueryKey> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    /// Keys carrying `scope` or any tag nested below it.
    pub fn keys_within(&self, scope: &Tag) -> HashSet<QueryKey> {
        self.tag_to_keys
            .iter()
            .filter(|(tag, _)| tag.is_within(scope))
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
    }

    /// Number of distinct tags currently tracked.
    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }
}
