//! Optimistic Mutation Coordinator
//!
//! Per-entity state machine for speculative updates:
//! `Settled` → `Pending` → `Settled` | `Reverted`.
//!
//! While a mutation is in flight the visible value is the reducer's guess.
//! The authoritative response replaces the guess on success; a failure
//! restores the value the entity had before the action.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::lock::mutex_lock;
use crate::error::{CacheError, Result};

const LOCK_TARGET: &str = "optimistic::coordinator";

/// Identifies an entity tracked by the coordinator.
pub trait EntityKey: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

impl<T> EntityKey for T where T: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

/// Computes the speculative value of an entity after an action.
///
/// Must be pure: the same value and action always give the same result.
pub trait Reducer: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;
    type Action: Send + Sync + 'static;

    /// Returns the speculative value, or a message describing why the action
    /// cannot apply to `current`.
    fn reduce(
        &self,
        current: &Self::Value,
        action: &Self::Action,
    ) -> std::result::Result<Self::Value, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Settled,
    Pending,
    Reverted,
}

#[derive(Debug)]
struct EntityState<V> {
    /// Last authoritative value
    settled: V,
    /// What readers see
    visible: V,
    status: MutationStatus,
    /// Bumped on every apply so a stale handle cannot touch a newer mutation
    generation: u64,
}

type Entities<K, V> = Arc<Mutex<HashMap<K, EntityState<V>>>>;

/// Tracks optimistic state for a set of entities.
pub struct OptimisticCoordinator<K, R: Reducer> {
    reducer: Arc<R>,
    entities: Entities<K, R::Value>,
}

impl<K, R: Reducer> Clone for OptimisticCoordinator<K, R> {
    fn clone(&self) -> Self {
        Self {
            reducer: Arc::clone(&self.reducer),
            entities: Arc::clone(&self.entities),
        }
    }
}

impl<K: EntityKey, R: Reducer> OptimisticCoordinator<K, R> {
    pub fn new(reducer: R) -> Self {
        Self {
            reducer: Arc::new(reducer),
            entities: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Seed ==
    /// Records an authoritative value for `key`, e.g. from a fresh read.
    ///
    /// A pending guess stays visible; only the value a revert falls back to
    /// changes.
    pub fn seed(&self, key: K, value: R::Value) {
        let mut entities = mutex_lock(&self.entities, LOCK_TARGET, "seed");
        match entities.get_mut(&key) {
            Some(state) if state.status == MutationStatus::Pending => {
                state.settled = value;
            }
            Some(state) => {
                state.settled = value.clone();
                state.visible = value;
                state.status = MutationStatus::Settled;
            }
            None => {
                entities.insert(
                    key,
                    EntityState {
                        settled: value.clone(),
                        visible: value,
                        status: MutationStatus::Settled,
                        generation: 0,
                    },
                );
            }
        }
    }

    /// The value readers should see right now.
    pub fn visible(&self, key: &K) -> Option<R::Value> {
        let entities = mutex_lock(&self.entities, LOCK_TARGET, "visible");
        entities.get(key).map(|state| state.visible.clone())
    }

    pub fn status(&self, key: &K) -> Option<MutationStatus> {
        let entities = mutex_lock(&self.entities, LOCK_TARGET, "status");
        entities.get(key).map(|state| state.status)
    }

    // == Apply ==
    /// Shows the reducer's guess immediately and returns a handle that
    /// resolves the mutation.
    ///
    /// Rejected with `MutationPending` while another mutation on the same
    /// entity is in flight, and with `InvalidAction` when the reducer refuses
    /// the action. Neither case changes state.
    pub fn apply(&self, key: K, action: R::Action) -> Result<PendingHandle<K, R>> {
        let mut entities = mutex_lock(&self.entities, LOCK_TARGET, "apply");
        let state = entities
            .get_mut(&key)
            .ok_or_else(|| CacheError::NotFound(format!("optimistic entity {key}")))?;

        if state.status == MutationStatus::Pending {
            return Err(CacheError::MutationPending(key.to_string()));
        }

        let speculative = self
            .reducer
            .reduce(&state.visible, &action)
            .map_err(CacheError::InvalidAction)?;

        state.visible = speculative.clone();
        state.status = MutationStatus::Pending;
        state.generation += 1;
        debug!(entity = %key, generation = state.generation, "Optimistic update applied");

        Ok(PendingHandle {
            entities: Arc::clone(&self.entities),
            key,
            generation: state.generation,
            speculative,
            done: false,
        })
    }
}

/// An in-flight optimistic mutation.
///
/// Exactly one of `settle`, `revert`, `resolve` or `spawn_resolve` finishes
/// it. Dropping an unfinished handle reverts.
pub struct PendingHandle<K: EntityKey, R: Reducer> {
    entities: Entities<K, R::Value>,
    key: K,
    generation: u64,
    speculative: R::Value,
    done: bool,
}

impl<K: EntityKey, R: Reducer> PendingHandle<K, R> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The guess shown while pending.
    pub fn speculative(&self) -> &R::Value {
        &self.speculative
    }

    /// Replaces the guess with the authoritative value.
    pub fn settle(mut self, authoritative: R::Value) {
        self.finish(Some(authoritative));
    }

    /// Restores the pre-action value.
    pub fn revert(mut self) {
        self.finish(None);
    }

    /// Awaits the authoritative mutation and settles or reverts on its outcome.
    ///
    /// A failed mutation surfaces as `MutationFailed`.
    ///
    /// The returned future owns the handle. Dropping it before it completes
    /// (a cancelled request, a `select!` branch that lost) reverts the entity
    /// at once, even if the mutation later succeeds on the server. Callers
    /// that may stop waiting must use [`spawn_resolve`](Self::spawn_resolve).
    pub async fn resolve<Fut>(mut self, mutation: Fut) -> Result<R::Value>
    where
        Fut: Future<Output = Result<R::Value>>,
    {
        match mutation.await {
            Ok(value) => {
                self.finish(Some(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.finish(None);
                Err(match err {
                    failed @ CacheError::MutationFailed(_) => failed,
                    other => CacheError::MutationFailed(other.to_string()),
                })
            }
        }
    }

    /// Resolves on a tokio task, so the entity settles or reverts even if the
    /// caller stops waiting.
    pub fn spawn_resolve<Fut>(self, mutation: Fut) -> JoinHandle<Result<R::Value>>
    where
        Fut: Future<Output = Result<R::Value>> + Send + 'static,
    {
        tokio::spawn(self.resolve(mutation))
    }

    fn finish(&mut self, authoritative: Option<R::Value>) {
        if self.done {
            return;
        }
        self.done = true;

        let mut entities = mutex_lock(&self.entities, LOCK_TARGET, "finish");
        let Some(state) = entities.get_mut(&self.key) else {
            return;
        };
        if state.generation != self.generation {
            debug!(entity = %self.key, "Stale optimistic handle ignored");
            return;
        }

        match authoritative {
            Some(value) => {
                state.settled = value.clone();
                state.visible = value;
                state.status = MutationStatus::Settled;
                debug!(entity = %self.key, "Optimistic update settled");
            }
            None => {
                state.visible = state.settled.clone();
                state.status = MutationStatus::Reverted;
                warn!(entity = %self.key, "Optimistic update reverted");
            }
        }
    }
}

impl<K: EntityKey, R: Reducer> Drop for PendingHandle<K, R> {
    fn drop(&mut self) {
        if !self.done {
            debug!(entity = %self.key, "Optimistic handle dropped unresolved");
            self.finish(None);
        }
    }
}
