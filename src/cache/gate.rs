//! Per-key build gates.
//!
//! A gate exists in the map only while some task holds or awaits it, which
//! lets the store tell which entries are mid-rebuild.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::keys::ViewKey;

#[derive(Default, Clone)]
pub(crate) struct Gates {
    inner: Arc<DashMap<ViewKey, Arc<Mutex<()>>>>,
}

impl Gates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive build rights on `key`.
    pub async fn acquire(&self, key: &ViewKey) -> GateGuard {
        let gate = Arc::clone(
            self.inner
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = gate.lock_owned().await;
        GateGuard {
            key: key.clone(),
            gates: Arc::clone(&self.inner),
            _guard: guard,
        }
    }

    /// Whether a build for `key` is running or queued.
    pub fn is_busy(&self, key: &ViewKey) -> bool {
        self.inner.contains_key(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

pub(crate) struct GateGuard {
    key: ViewKey,
    gates: Arc<DashMap<ViewKey, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        // One reference lives in the map and one in our guard; anything above
        // that is a waiter that still needs the gate.
        self.gates
            .remove_if(&self.key, |_, gate| Arc::strong_count(gate) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::cache::keys::Key;

    use super::*;

    fn key(id: u64) -> ViewKey {
        ViewKey::new("thread", Key::thread(id, 0))
    }

    #[tokio::test]
    async fn gate_is_removed_once_released() {
        let gates = Gates::new();
        let guard = gates.acquire(&key(1)).await;
        assert!(gates.is_busy(&key(1)));
        assert!(!gates.is_busy(&key(2)));
        drop(guard);
        assert!(!gates.is_busy(&key(1)));
        assert_eq!(gates.len(), 0);
    }

    #[tokio::test]
    async fn waiter_keeps_gate_alive() {
        let gates = Gates::new();
        let guard = gates.acquire(&key(1)).await;

        let waiter = {
            let gates = gates.clone();
            tokio::spawn(async move {
                let _guard = gates.acquire(&key(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert!(gates.is_busy(&key(1)));
        waiter.await.expect("waiter should finish");
        assert!(!gates.is_busy(&key(1)));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let gates = Gates::new();
        let _first = gates.acquire(&key(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(200), gates.acquire(&key(2))).await;
        assert!(second.is_ok());
    }
}
