use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Locks a std mutex, recovering the guard if another thread panicked while
/// holding it. Critical sections in this crate never leave tables half-updated
/// across a panic point, so the recovered state is still consistent.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned lock"
            );
            poisoned.into_inner()
        }
    }
}
