//! Lock helpers that recover from poisoning instead of propagating panics.
//!
//! A panic inside a descriptor never holds these locks, so the guarded state
//! is still consistent when we take it over.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use tracing::warn;

const TARGET: &str = "cache::store";

pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), op, "rwlock.read")
}

pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), op, "rwlock.write")
}

/// Write access only if nobody else holds the lock right now.
pub(crate) fn try_write<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> Option<RwLockWriteGuard<'a, T>> {
    match lock.try_write() {
        Ok(guard) => Some(guard),
        Err(TryLockError::WouldBlock) => None,
        Err(TryLockError::Poisoned(poisoned)) => {
            Some(recover(Err(poisoned), op, "rwlock.try_write"))
        }
    }
}

fn recover<G>(result: LockResult<G>, op: &'static str, lock_kind: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = TARGET,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned view cache lock"
        );
        poisoned.into_inner()
    })
}
