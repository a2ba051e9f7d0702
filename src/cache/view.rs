//! Payloads carried through the cache.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::domain::entities::{BoardListing, PageStore, Thread};

/// Structured result of a view build.
///
/// Each descriptor constructs and destructures its own variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewData {
    Thread(Thread),
    Listing(BoardListing),
    Pages(Vec<PageStore>),
    Page(PageStore),
}

impl ViewData {
    pub fn as_thread(&self) -> Option<&Thread> {
        match self {
            Self::Thread(thread) => Some(thread),
            _ => None,
        }
    }

    pub fn as_listing(&self) -> Option<&BoardListing> {
        match self {
            Self::Listing(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn as_pages(&self) -> Option<&[PageStore]> {
        match self {
            Self::Pages(pages) => Some(pages),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&PageStore> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }
}

/// Everything stored for one key. The bytes and markup are always derived
/// from `data` as it was built for `counter`.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub counter: u64,
    pub data: Arc<ViewData>,
    pub encoded: Bytes,
    pub markup: Option<Bytes>,
    pub size: usize,
}

impl CacheEntry {
    pub fn view(&self) -> CachedView {
        CachedView {
            counter: self.counter,
            data: Arc::clone(&self.data),
            encoded: self.encoded.clone(),
            markup: self.markup.clone(),
        }
    }
}

/// A cached view handed to callers. Buffers are shared with the store and
/// with every other reader of the same entry.
#[derive(Debug, Clone)]
pub struct CachedView {
    counter: u64,
    data: Arc<ViewData>,
    encoded: Bytes,
    markup: Option<Bytes>,
}

impl CachedView {
    /// Freshness counter the view was built against.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn data(&self) -> &ViewData {
        &self.data
    }

    /// Encoded JSON, ready to be written to the wire.
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// Rendered HTML, absent for API-only views.
    pub fn markup(&self) -> Option<&Bytes> {
        self.markup.as_ref()
    }
}
