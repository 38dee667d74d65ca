//! Cache Entry Module
//!
//! Defines the structure for individual memoized read results.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::{QueryKey, Tag};

/// Type-erased cached value. Handed out as `Arc<T>` after a downcast.
pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

// == Cache Entry ==
/// A loaded read result with its metadata.
///
/// Entries are owned by the read cache; callers only ever see the value.
#[derive(Clone)]
pub struct CacheEntry {
    /// Key the value was loaded for
    pub key: QueryKey,
    /// Loaded value
    pub(crate) value: ErasedValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Scopes this entry is invalidated by
    pub tags: HashSet<Tag>,
}

impl CacheEntry {
    // == Constructor ==
    pub(crate) fn new(key: QueryKey, value: ErasedValue, tags: HashSet<Tag>) -> Self {
        Self {
            key,
            value,
            created_at: current_timestamp_ms(),
            tags,
        }
    }

    // == Age ==
    /// Milliseconds since the value was loaded.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.created_at)
    }

    // == Is Older Than ==
    /// Checks whether the entry has outlived a revalidation window.
    ///
    /// Boundary condition: an entry whose age equals the window is outdated.
    pub fn is_older_than(&self, window: Duration) -> bool {
        self.is_older_than_at(window, current_timestamp_ms())
    }

    /// Same check as [`is_older_than`](Self::is_older_than), measured at `at_ms`.
    ///
    /// Entries created after `at_ms` are never outdated.
    pub fn is_older_than_at(&self, window: Duration, at_ms: u64) -> bool {
        u128::from(at_ms.saturating_sub(self.created_at)) >= window.as_millis()
    }

    /// Downcasts the value to the caller's type.
    pub(crate) fn value_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("created_at", &self.created_at)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
