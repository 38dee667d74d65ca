//! Optimistic Module
//!
//! Client-side speculative updates reconciled against authoritative mutations.

mod coordinator;
mod likes;

pub use coordinator::{EntityKey, MutationStatus, OptimisticCoordinator, PendingHandle, Reducer};
pub use likes::{LikeAction, LikeCoordinator, LikeReducer, LikeState};
