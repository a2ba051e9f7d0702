//! Counter-validated view store.
//!
//! A view is served from memory while the freshness counter reported by its
//! descriptor still equals the counter it was built against. Otherwise it is
//! rebuilt, with at most one concurrent build per key.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use lru::LruCache;
use metrics::{counter, gauge, histogram};
use tracing::{Instrument, debug, debug_span, warn};

use super::config::CacheConfig;
use super::descriptor::ViewDescriptor;
use super::error::CacheError;
use super::gate::Gates;
use super::keys::{Key, ViewKey};
use super::lock::{read, try_write, write};
use super::view::{CacheEntry, CachedView};

const METRIC_HIT: &str = "boardcache_view_hit_total";
const METRIC_MISS: &str = "boardcache_view_miss_total";
const METRIC_BUILD: &str = "boardcache_view_build_total";
const METRIC_EVICT: &str = "boardcache_view_evict_total";
const METRIC_BYTES: &str = "boardcache_view_bytes";
const METRIC_BUILD_MS: &str = "boardcache_view_build_ms";

struct Entries {
    lru: LruCache<ViewKey, CacheEntry>,
    size: usize,
}

struct Inner {
    capacity: usize,
    entries: RwLock<Entries>,
    gates: Gates,
}

/// Process-wide view cache.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct ViewCache {
    inner: Arc<Inner>,
}

impl ViewCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: config.capacity_non_zero().get(),
                entries: RwLock::new(Entries {
                    lru: LruCache::unbounded(),
                    size: 0,
                }),
                gates: Gates::new(),
            }),
        }
    }

    /// Return the view for `key`, rebuilding it through `descriptor` when the
    /// stored copy is missing or its counter no longer matches.
    ///
    /// Concurrent callers for the same key share a single build. The build
    /// runs on its own task, so a caller that gives up waiting does not
    /// cancel it.
    pub async fn fetch_or_build(
        &self,
        key: Key,
        descriptor: Arc<dyn ViewDescriptor>,
    ) -> Result<CachedView, CacheError> {
        let family = descriptor.family();
        let counter = descriptor.counter(self, &key).await?;

        let view_key = ViewKey::new(family, key);
        if let Some(view) = self.lookup(&view_key, counter) {
            counter!(METRIC_HIT, "family" => family).increment(1);
            debug!(key = %view_key, counter, "view hit");
            return Ok(view);
        }
        counter!(METRIC_MISS, "family" => family).increment(1);

        let span = debug_span!("view_build", family, key = %view_key.key);
        let cache = self.clone();
        let build = tokio::spawn(
            async move { cache.build_gated(view_key, descriptor).await }.instrument(span),
        );

        match build.await {
            Ok(result) => result,
            Err(join_error) => Err(CacheError::BuildAborted(join_error.to_string())),
        }
    }

    async fn build_gated(
        &self,
        view_key: ViewKey,
        descriptor: Arc<dyn ViewDescriptor>,
    ) -> Result<CachedView, CacheError> {
        let _gate = self.inner.gates.acquire(&view_key).await;

        // Re-read under the gate: counters are observed in gate order, so a
        // newer build can never be overwritten by an older counter.
        let counter = descriptor.counter(self, &view_key.key).await?;
        if let Some(view) = self.lookup(&view_key, counter) {
            debug!("view rebuilt by a concurrent caller");
            return Ok(view);
        }

        let started_at = Instant::now();
        let entry = match self.build(&view_key, descriptor.as_ref(), counter).await {
            Ok(entry) => entry,
            Err(error) => {
                if !error.is_not_found() {
                    warn!(error = %error, "view build failed");
                }
                return Err(error);
            }
        };

        counter!(METRIC_BUILD, "family" => view_key.family).increment(1);
        histogram!(METRIC_BUILD_MS, "family" => view_key.family)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(counter, size = entry.size, "view built");

        let view = entry.view();
        self.insert(view_key, entry);
        Ok(view)
    }

    async fn build(
        &self,
        view_key: &ViewKey,
        descriptor: &dyn ViewDescriptor,
        counter: u64,
    ) -> Result<CacheEntry, CacheError> {
        let data = descriptor.fresh(self, &view_key.key).await?;
        let encoded = descriptor.encode(&data)?;
        let markup = descriptor.render(&data, &encoded)?;
        let size = descriptor.size(&data, &encoded, markup.as_ref());

        Ok(CacheEntry {
            counter,
            data: Arc::new(data),
            encoded,
            markup,
            size,
        })
    }

    fn lookup(&self, view_key: &ViewKey, counter: u64) -> Option<CachedView> {
        let view = {
            let entries = read(&self.inner.entries, "lookup");
            let entry = entries.lru.peek(view_key)?;
            if entry.counter != counter {
                return None;
            }
            entry.view()
        };
        // Recency is best effort: a busy store serves the hit unpromoted.
        if let Some(mut entries) = try_write(&self.inner.entries, "lookup.promote") {
            entries.lru.promote(view_key);
        }
        Some(view)
    }

    fn insert(&self, view_key: ViewKey, entry: CacheEntry) {
        let mut entries = write(&self.inner.entries, "insert");
        let added = entry.size;
        if let Some(previous) = entries.lru.put(view_key.clone(), entry) {
            entries.size -= previous.size;
        }
        entries.size += added;

        if entries.size > self.inner.capacity {
            self.evict(&mut entries, &view_key);
        }
        gauge!(METRIC_BYTES).set(entries.size as f64);
    }

    /// Drop least recently used entries until the store fits its capacity.
    /// Entries with a build in flight and the entry just inserted are kept.
    fn evict(&self, entries: &mut Entries, inserted: &ViewKey) {
        let mut excess = entries.size - self.inner.capacity;
        let mut victims = Vec::new();
        for (key, entry) in entries.lru.iter().rev() {
            if excess == 0 {
                break;
            }
            if key == inserted || self.inner.gates.is_busy(key) {
                continue;
            }
            victims.push(key.clone());
            excess = excess.saturating_sub(entry.size);
        }

        for key in victims {
            if let Some(evicted) = entries.lru.pop(&key) {
                entries.size -= evicted.size;
                counter!(METRIC_EVICT, "family" => key.family).increment(1);
                debug!(key = %key, size = evicted.size, "evicted view");
            }
        }
    }

    /// Remove every entry. Builds in flight still store their result.
    pub fn clear(&self) {
        let mut entries = write(&self.inner.entries, "clear");
        entries.lru.clear();
        entries.size = 0;
        gauge!(METRIC_BYTES).set(0.0);
    }

    pub fn len(&self) -> usize {
        read(&self.inner.entries, "len").lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated bytes held by all entries.
    pub fn size_bytes(&self) -> usize {
        read(&self.inner.entries, "size_bytes").size
    }

    pub fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    /// Whether an entry for `key` of `family` is currently stored.
    pub fn contains(&self, family: &'static str, key: &Key) -> bool {
        read(&self.inner.entries, "contains")
            .lru
            .contains(&ViewKey::new(family, key.clone()))
    }
}
