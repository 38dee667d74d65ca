//! Read Cache Module
//!
//! Memoizes read results per key, shares in-flight loads between callers and
//! scopes entry lifetime to explicit cycles.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::lock::mutex_lock;
use crate::cache::registry::TagIndex;
use crate::cache::{CacheEntry, CacheStats, QueryKey, Scope, Tag};
use crate::config::CacheMode;
use crate::error::{CacheError, Result};

const TARGET: &str = "cache::read_cache";

// == Cache Config ==
/// Lifetime policy of a read cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Whether entries belong to one cycle or are shared across cycles
    pub mode: CacheMode,
    /// Shared entries older than this when a cycle starts are reloaded by it
    pub revalidate: Option<Duration>,
}

impl CacheConfig {
    pub fn per_cycle() -> Self {
        Self {
            mode: CacheMode::PerCycle,
            revalidate: None,
        }
    }

    pub fn until_invalidated() -> Self {
        Self {
            mode: CacheMode::UntilInvalidated,
            revalidate: None,
        }
    }

    pub fn with_revalidate(mut self, window: Duration) -> Self {
        self.revalidate = Some(window);
        self
    }
}

type CycleId = u64;
type EntryCell = Arc<OnceCell<Arc<CacheEntry>>>;

/// A table slot. The cell is empty while the first load is in flight.
struct Slot {
    cell: EntryCell,
    tags: HashSet<Tag>,
}

/// Slots plus the tag index over them.
#[derive(Default)]
struct Memo {
    slots: HashMap<QueryKey, Slot>,
    index: TagIndex,
}

impl Memo {
    fn insert(&mut self, key: &QueryKey, tags: HashSet<Tag>) -> (EntryCell, HashSet<Tag>) {
        let cell: EntryCell = Arc::new(OnceCell::new());
        self.index.register(key, &tags);
        self.slots.insert(
            key.clone(),
            Slot {
                cell: Arc::clone(&cell),
                tags: tags.clone(),
            },
        );
        (cell, tags)
    }

    fn remove(&mut self, key: &QueryKey) -> bool {
        match self.slots.remove(key) {
            Some(slot) => {
                self.index.unregister(key, &slot.tags);
                true
            }
            None => false,
        }
    }

    fn invalidate(&mut self, scope: &Scope) -> usize {
        let keys = match scope {
            Scope::Exact(tag) => self.index.keys_for_tag(tag),
            Scope::Subtree(tag) => self.index.keys_within(tag),
        };
        keys.iter().filter(|key| self.remove(key)).count()
    }

    fn contains(&self, key: &QueryKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.cell.initialized())
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Where a read looks up its slot.
#[derive(Debug, Clone, Copy)]
struct ReadScope {
    /// Owning cycle for per-cycle memos; `None` is the shared memo
    memo: Option<CycleId>,
    /// Start of the reading cycle, for the revalidation window
    started_ms: u64,
}

#[derive(Default)]
struct Table {
    shared: Memo,
    cycles: HashMap<CycleId, Memo>,
    stats: CacheStats,
    next_cycle: CycleId,
    active_cycles: usize,
}

impl Table {
    fn memo_mut(&mut self, owner: Option<CycleId>) -> Option<&mut Memo> {
        match owner {
            None => Some(&mut self.shared),
            Some(id) => self.cycles.get_mut(&id),
        }
    }

    fn len(&self) -> usize {
        self.shared.len() + self.cycles.values().map(Memo::len).sum::<usize>()
    }

    fn sync_len(&mut self) {
        let len = self.len();
        self.stats.set_total_entries(len);
    }
}

// == Read Cache ==
/// Memoizing read cache.
///
/// In `UntilInvalidated` mode all cycles share one memo, and an entry is
/// served until its scope is invalidated or it falls outside the revalidation
/// window at the start of a reading cycle. In `PerCycle` mode every cycle has
/// a private memo that is dropped when the cycle ends.
///
/// Removal detaches the slot, so a load still in flight for a removed slot
/// completes for its own waiters only and is never served to later readers.
pub struct ReadCache {
    config: CacheConfig,
    table: Mutex<Table>,
}

impl ReadCache {
    // == Constructor ==
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            table: Mutex::new(Table::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Returns the cached value for `key` outside any cycle, loading it on a miss.
    ///
    /// Uses the shared memo. In `PerCycle` mode there is nothing to share, so
    /// the read is a cycle of its own: it always loads and caches nothing.
    pub async fn get<T, F, Fut>(&self, key: QueryKey, tags: &[Tag], loader: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.config.mode == CacheMode::PerCycle {
            return self.load_uncached(&key, loader).await;
        }
        let scope = ReadScope {
            memo: None,
            started_ms: current_timestamp_ms(),
        };
        self.get_in(scope, key, tags, loader).await
    }

    /// Concurrent callers for the same slot share one `loader` call. A failed
    /// load is not cached: the error goes to the caller and the next read
    /// loads again. Repeated hits return the same `Arc`.
    async fn get_in<T, F, Fut>(
        &self,
        scope: ReadScope,
        key: QueryKey,
        tags: &[Tag],
        loader: F,
    ) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (cell, slot_tags) = self.slot_for(scope, &key, tags)?;

        let entry = cell
            .get_or_try_init(|| {
                let cell = Arc::clone(&cell);
                let key = key.clone();
                async move {
                    debug!(key = %key, "Loading from store");
                    match loader().await {
                        Ok(value) => {
                            self.record_load(true);
                            Ok(Arc::new(CacheEntry::new(key, Arc::new(value), slot_tags)))
                        }
                        Err(err) => {
                            self.record_load(false);
                            self.forget_failed(scope.memo, &key, &cell);
                            debug!(key = %key, error = %err, "Load failed, not cached");
                            Err(err)
                        }
                    }
                }
            })
            .await?;

        entry
            .value_as::<T>()
            .ok_or_else(|| CacheError::TypeMismatch(key.to_string()))
    }

    async fn load_uncached<T, F, Fut>(&self, key: &QueryKey, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        mutex_lock(&self.table, TARGET, "load_uncached")
            .stats
            .record_miss();
        debug!(key = %key, "Read outside a cycle, loading without caching");

        let result = loader().await;
        self.record_load(result.is_ok());
        result.map(Arc::new)
    }

    /// Finds or creates the slot for `key` in the memo `scope` points at.
    fn slot_for(
        &self,
        scope: ReadScope,
        key: &QueryKey,
        tags: &[Tag],
    ) -> Result<(EntryCell, HashSet<Tag>)> {
        let mut guard = mutex_lock(&self.table, TARGET, "slot_for");
        let Table {
            shared,
            cycles,
            stats,
            ..
        } = &mut *guard;

        let memo = match scope.memo {
            None => shared,
            Some(id) => cycles
                .get_mut(&id)
                .ok_or_else(|| CacheError::Internal(format!("read on ended cycle for {key}")))?,
        };

        let mut outdated = false;
        if let Some(slot) = memo.slots.get(key) {
            match (slot.cell.get(), self.config.revalidate) {
                (Some(entry), Some(window)) if entry.is_older_than_at(window, scope.started_ms) => {
                    outdated = true;
                }
                (Some(_), _) => {
                    stats.record_hit();
                    debug!(key = %key, "Cache hit");
                    return Ok((Arc::clone(&slot.cell), slot.tags.clone()));
                }
                (None, _) => {
                    stats.record_coalesced();
                    debug!(key = %key, "Joining in-flight load");
                    return Ok((Arc::clone(&slot.cell), slot.tags.clone()));
                }
            }
        }

        if outdated {
            memo.remove(key);
            debug!(key = %key, "Entry outside revalidation window, reloading");
        }
        let found = memo.insert(key, tags.iter().cloned().collect());
        stats.record_miss();
        debug!(key = %key, "Cache miss");
        guard.sync_len();
        Ok(found)
    }

    /// Drops the slot of a failed load unless it was replaced meanwhile.
    fn forget_failed(&self, owner: Option<CycleId>, key: &QueryKey, cell: &EntryCell) {
        let mut table = mutex_lock(&self.table, TARGET, "forget_failed");
        let Some(memo) = table.memo_mut(owner) else {
            return;
        };
        let owned = memo
            .slots
            .get(key)
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell) && !slot.cell.initialized());
        if owned {
            memo.remove(key);
            table.sync_len();
        }
    }

    fn record_load(&self, ok: bool) {
        mutex_lock(&self.table, TARGET, "record_load")
            .stats
            .record_load(ok);
    }

    // == Invalidate ==
    /// Removes every entry matched by `scope`, in the shared memo and in
    /// every live cycle. Returns how many were removed.
    ///
    /// Unknown tags match nothing; that is not an error.
    pub(crate) fn invalidate(&self, scope: &Scope) -> usize {
        let mut guard = mutex_lock(&self.table, TARGET, "invalidate");
        let table = &mut *guard;

        let removed = table.shared.invalidate(scope)
            + table
                .cycles
                .values_mut()
                .map(|memo| memo.invalidate(scope))
                .sum::<usize>();
        table.stats.record_invalidated(removed);
        table.sync_len();
        removed
    }

    // == Cycles ==
    /// Starts a cycle. The cycle ends when the returned guard is dropped.
    pub fn begin_cycle(self: &Arc<Self>) -> CycleGuard {
        let mut table = mutex_lock(&self.table, TARGET, "begin_cycle");
        table.next_cycle += 1;
        table.active_cycles += 1;
        let id = table.next_cycle;
        if self.config.mode == CacheMode::PerCycle {
            table.cycles.insert(id, Memo::default());
        }
        CycleGuard {
            cache: Arc::clone(self),
            id,
            started_ms: current_timestamp_ms(),
        }
    }

    fn end_cycle(&self, id: CycleId) {
        let mut table = mutex_lock(&self.table, TARGET, "end_cycle");
        table.active_cycles = table.active_cycles.saturating_sub(1);
        table.stats.record_cycle();

        if let Some(memo) = table.cycles.remove(&id) {
            if memo.len() > 0 {
                debug!(cycle = id, removed = memo.len(), "Cycle ended, memo dropped");
            }
        }
        table.sync_len();
    }

    /// Number of cycles currently in flight.
    pub fn active_cycles(&self) -> usize {
        mutex_lock(&self.table, TARGET, "active_cycles").active_cycles
    }

    // == Clear ==
    /// Drops every entry regardless of scope. Live cycles keep their
    /// (now empty) memos.
    pub fn clear(&self) {
        let mut table = mutex_lock(&self.table, TARGET, "clear");
        let count = table.len();
        table.shared = Memo::default();
        for memo in table.cycles.values_mut() {
            *memo = Memo::default();
        }
        table.sync_len();
        info!(removed = count, "Read cache cleared");
    }

    // == Contains ==
    /// True if a loaded entry exists for `key` in any memo.
    pub fn contains(&self, key: &QueryKey) -> bool {
        let table = mutex_lock(&self.table, TARGET, "contains");
        table.shared.contains(key) || table.cycles.values().any(|memo| memo.contains(key))
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let table = mutex_lock(&self.table, TARGET, "stats");
        let mut stats = table.stats.clone();
        stats.set_total_entries(table.len());
        stats
    }

    // == Length ==
    /// Number of slots across all memos, including loads still in flight.
    pub fn len(&self) -> usize {
        mutex_lock(&self.table, TARGET, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

// == Cycle Guard ==
/// Marks one request/render cycle in flight on a read cache.
///
/// Reads made through the guard see the cycle's memo: private to the cycle
/// and dropped with it in `PerCycle` mode, shared otherwise. Shared entries
/// outside the revalidation window when the cycle started are reloaded.
pub struct CycleGuard {
    cache: Arc<ReadCache>,
    id: CycleId,
    started_ms: u64,
}

impl CycleGuard {
    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the value for `key` as seen by this cycle, loading it on a miss.
    pub async fn get<T, F, Fut>(&self, key: QueryKey, tags: &[Tag], loader: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let memo = match self.cache.config.mode {
            CacheMode::PerCycle => Some(self.id),
            CacheMode::UntilInvalidated => None,
        };
        let scope = ReadScope {
            memo,
            started_ms: self.started_ms,
        };
        self.cache.get_in(scope, key, tags, loader).await
    }

    /// Ends the cycle now.
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.cache.end_cycle(self.id);
    }
}
