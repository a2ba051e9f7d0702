//! The per-family view contract the store is generic over.

use async_trait::async_trait;
use bytes::Bytes;

use super::{CacheError, Key, ViewCache, ViewData};

/// Describes how one family of views is validated, built, encoded, rendered
/// and sized.
///
/// Descriptors are constructed once at startup and shared between requests;
/// they hold no per-request state. Composite descriptors receive the store so
/// they can assemble their payload from other cached views.
#[async_trait]
pub trait ViewDescriptor: Send + Sync + 'static {
    /// Stable name of the view family. Keys of different families never
    /// share an entry.
    fn family(&self) -> &'static str;

    /// Cheap freshness signal for `key`.
    async fn counter(&self, cache: &ViewCache, key: &Key) -> Result<u64, CacheError>;

    /// Build the payload for `key` from scratch.
    async fn fresh(&self, cache: &ViewCache, key: &Key) -> Result<ViewData, CacheError>;

    /// Encode the payload for transmission. Defaults to JSON.
    fn encode(&self, data: &ViewData) -> Result<Bytes, CacheError> {
        Ok(Bytes::from(serde_json::to_vec(data)?))
    }

    /// Render markup from the payload and its encoded form. API-only views
    /// return `None`.
    fn render(&self, _data: &ViewData, _encoded: &Bytes) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    /// Bytes charged against the store capacity. Defaults to the encoded
    /// length.
    fn size(&self, _data: &ViewData, encoded: &Bytes, _markup: Option<&Bytes>) -> usize {
        encoded.len()
    }
}
