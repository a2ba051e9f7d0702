//! Cache configuration.
//!
//! Populated from the `[cache]` section of `boardcache.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_CAPACITY_BYTES: usize = 128 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total estimated size of all cached views before LRU eviction kicks in.
    pub capacity_bytes: usize,
    /// Drop threads of NSFW boards from the `/all/` board index.
    pub hide_nsfw: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            hide_nsfw: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            capacity_bytes: settings.capacity_bytes.get(),
            hide_nsfw: settings.hide_nsfw,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity_bytes).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity_bytes, 128 * 1024 * 1024);
        assert!(!config.hide_nsfw);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            capacity_bytes: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
