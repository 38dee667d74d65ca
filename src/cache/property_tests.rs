//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check memoization, staleness and subtree coverage over
//! random operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::{CacheConfig, Invalidator, QueryKey, ReadCache, Scope, Tag};
use crate::error::CacheError;

// == Test Configuration ==
/// Tag paths keys are spread over. `ab` shares a prefix with `a` but is not below it.
const TAG_PATHS: &[&str] = &["a", "a/b", "a/b/c", "a/d", "ab", "e", "e/f"];
const KEY_COUNT: usize = 10;

fn key_name(idx: usize) -> String {
    format!("k{}", idx)
}

fn tag_of(idx: usize) -> Tag {
    Tag::new(TAG_PATHS[idx % TAG_PATHS.len()])
}

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Get { key: usize },
    Invalidate { scope: Scope },
}

fn scope_strategy() -> impl Strategy<Value = Scope> {
    (0..TAG_PATHS.len(), any::<bool>()).prop_map(|(idx, subtree)| {
        let tag = Tag::new(TAG_PATHS[idx]);
        if subtree {
            Scope::Subtree(tag)
        } else {
            Scope::Exact(tag)
        }
    })
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (0..KEY_COUNT).prop_map(|key| CacheOp::Get { key }),
        1 => scope_strategy().prop_map(|scope| CacheOp::Invalidate { scope }),
    ]
}

async fn get_counted(cache: &ReadCache, idx: usize, loads: &AtomicUsize) -> Arc<usize> {
    cache
        .get(QueryKey::new(key_name(idx)), &[tag_of(idx)], || async move {
            Ok::<_, CacheError>(loads.fetch_add(1, Ordering::SeqCst))
        })
        .await
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: Memoization
    // A read loads only when its key has never been loaded or was invalidated
    // since the last load; otherwise it returns the same Arc as before.
    #[test]
    fn prop_memoization_and_staleness(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = Arc::new(ReadCache::new(CacheConfig::until_invalidated()));
        let invalidator = Invalidator::new(Arc::clone(&cache));
        let loads = AtomicUsize::new(0);

        let mut model: HashMap<usize, Arc<usize>> = HashMap::new();
        let mut expected_loads = 0usize;

        for op in ops {
            match op {
                CacheOp::Get { key } => {
                    let value = tokio_test::block_on(get_counted(&cache, key, &loads));
                    match model.get(&key) {
                        Some(previous) => {
                            prop_assert!(Arc::ptr_eq(previous, &value), "Memoized value changed identity");
                        }
                        None => {
                            expected_loads += 1;
                            model.insert(key, value);
                        }
                    }
                }
                CacheOp::Invalidate { scope } => {
                    invalidator.invalidate(&scope);
                    model.retain(|key, _| !scope.covers(&tag_of(*key)));
                }
            }
            prop_assert_eq!(loads.load(Ordering::SeqCst), expected_loads, "Load count mismatch");
            prop_assert_eq!(cache.len(), model.len(), "Entry count mismatch");
        }
    }

    // Property 2: Idempotent Invalidation
    // Invalidating the same scope twice leaves the same entries as once.
    #[test]
    fn prop_invalidate_twice_equals_once(
        keys in prop::collection::hash_set(0..KEY_COUNT, 1..KEY_COUNT),
        scope in scope_strategy()
    ) {
        let cache = Arc::new(ReadCache::default());
        let invalidator = Invalidator::new(Arc::clone(&cache));
        let loads = AtomicUsize::new(0);

        for key in &keys {
            tokio_test::block_on(get_counted(&cache, *key, &loads));
        }

        invalidator.invalidate(&scope);
        let after_once: HashSet<usize> = keys
            .iter()
            .copied()
            .filter(|key| cache.contains(&QueryKey::new(key_name(*key))))
            .collect();

        prop_assert_eq!(invalidator.invalidate(&scope), 0, "Second invalidation removed entries");
        let after_twice: HashSet<usize> = keys
            .iter()
            .copied()
            .filter(|key| cache.contains(&QueryKey::new(key_name(*key))))
            .collect();

        prop_assert_eq!(after_once, after_twice);
    }

    // Property 3: Subtree Coverage
    // A subtree invalidation removes exactly the entries whose tag is the
    // scope or nested under it.
    #[test]
    fn prop_subtree_removes_exactly_descendants(scope_idx in 0..TAG_PATHS.len()) {
        let cache = Arc::new(ReadCache::default());
        let invalidator = Invalidator::new(Arc::clone(&cache));
        let loads = AtomicUsize::new(0);

        for key in 0..KEY_COUNT {
            tokio_test::block_on(get_counted(&cache, key, &loads));
        }

        let scope = Tag::new(TAG_PATHS[scope_idx]);
        invalidator.invalidate_subtree(scope.clone());

        for key in 0..KEY_COUNT {
            let present = cache.contains(&QueryKey::new(key_name(key)));
            prop_assert_eq!(present, !tag_of(key).is_within(&scope), "key {} with tag {}", key, tag_of(key));
        }
    }
}

// Single-flight needs a multi-threaded runtime to race real tasks.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Property 4: Single-flight
    // Any number of simultaneous reads of a cold key cause exactly one load.
    #[test]
    fn prop_single_flight(readers in 2usize..16) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (loads, distinct) = runtime.block_on(async {
            let cache = Arc::new(ReadCache::default());
            let loads = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(tokio::sync::Barrier::new(readers));

            let handles: Vec<_> = (0..readers)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let loads = Arc::clone(&loads);
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        cache
                            .get(QueryKey::new("all-messages"), &[Tag::new("messages")], || async move {
                                loads.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                                Ok::<_, CacheError>(vec![1_u8, 2, 3])
                            })
                            .await
                            .unwrap()
                    })
                })
                .collect();

            let mut values = Vec::new();
            for handle in handles {
                values.push(handle.await.unwrap());
            }
            let first = Arc::clone(&values[0]);
            let distinct = values.iter().filter(|v| !Arc::ptr_eq(v, &first)).count();
            (loads.load(Ordering::SeqCst), distinct)
        });

        prop_assert_eq!(loads, 1, "Store queried more than once");
        prop_assert_eq!(distinct, 0, "Readers observed different values");
    }
}
