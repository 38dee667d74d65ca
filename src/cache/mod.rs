//! Cache Module
//!
//! Request-scoped read memoization with tag-based invalidation.

mod entry;
mod invalidation;
mod key;
pub(crate) mod lock;
mod read_cache;
mod registry;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use invalidation::{Invalidator, Scope};
pub use key::{QueryKey, Tag};
pub use read_cache::{CacheConfig, CycleGuard, ReadCache};
pub use registry::TagIndex;
pub use stats::CacheStats;
