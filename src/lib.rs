//! Revalidate - request-scoped read caching with tag invalidation
//!
//! Memoizes store reads within and across request cycles, invalidates them by
//! exact tag or tag subtree after successful writes, and reconciles optimistic
//! client updates with authoritative mutations.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod models;
pub mod optimistic;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use context::RequestContext;
pub use error::{CacheError, Result};
