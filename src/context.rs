//! Request Context
//!
//! Carries the read cache, the invalidation controller and the store through
//! one request/render cycle.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CycleGuard, Invalidator, QueryKey, ReadCache, Scope, Tag};
use crate::error::Result;
use crate::store::{ExecOutcome, StoreAccessor};

/// One cycle's view of the cache and store.
///
/// Reads go through the cache; writes go through [`RequestContext::mutate`],
/// which is the only path to storage and always invalidates after a
/// successful write. The cycle ends when the context is dropped.
pub struct RequestContext {
    cycle: CycleGuard,
    invalidator: Invalidator,
    store: Arc<dyn StoreAccessor>,
}

impl RequestContext {
    /// Starts a cycle on `cache`.
    pub fn begin(cache: &Arc<ReadCache>, store: Arc<dyn StoreAccessor>) -> Self {
        Self {
            cycle: cache.begin_cycle(),
            invalidator: Invalidator::new(Arc::clone(cache)),
            store,
        }
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        self.cycle.cache()
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.invalidator
    }

    // == Read ==
    /// Memoized read within this cycle. `loader` receives the store on a miss.
    pub async fn read<T, F, Fut>(&self, key: QueryKey, tags: &[Tag], loader: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce(Arc<dyn StoreAccessor>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let store = Arc::clone(&self.store);
        self.cycle.get(key, tags, move || loader(store)).await
    }

    // == Mutate ==
    /// Persists a write, then invalidates `scopes`.
    ///
    /// The store call completes before any scope is touched; a failed write
    /// invalidates nothing.
    pub async fn mutate(
        &self,
        statement: &str,
        params: Vec<Value>,
        scopes: &[Scope],
    ) -> Result<ExecOutcome> {
        let outcome = match self.store.execute(statement, params).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "Mutation failed, cache left untouched");
                return Err(err);
            }
        };
        let removed = self.invalidator.on_mutation_success(scopes);
        debug!(
            rows = outcome.rows_affected,
            removed, "Mutation persisted and invalidated"
        );
        Ok(outcome)
    }

    /// Ends the cycle now.
    pub fn finish(self) {
        drop(self);
    }
}
