//! Boardcache view cache.
//!
//! Rendered views (threads, catalogs, board indexes and single index pages)
//! are kept in memory together with the freshness counter they were built
//! against. Every request asks the view's descriptor for the current counter
//! and only rebuilds when it moved, so writers never have to push
//! invalidations.
//!
//! - [`ViewCache`] is the engine: lookup, per-key single-flight rebuilds and
//!   size-bounded LRU eviction.
//! - [`ViewDescriptor`] is the contract each page type implements.
//! - [`frontends`] holds the thread, catalog, board and board page
//!   descriptors. Board views are assembled from cached thread views, and
//!   board pages are sliced out of cached board views.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! capacity_bytes = 134217728
//! hide_nsfw = false
//! ```

mod config;
mod descriptor;
mod error;
pub mod frontends;
mod gate;
mod keys;
mod lock;
mod store;
mod view;

pub use config::CacheConfig;
pub use descriptor::ViewDescriptor;
pub use error::CacheError;
pub use frontends::Frontends;
pub use keys::{Key, ViewKey};
pub use store::ViewCache;
pub use view::{CachedView, ViewData};
