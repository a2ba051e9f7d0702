use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::application::markup::MarkupRenderer;
use crate::application::repos::ThreadsRepo;
use crate::cache::{CacheError, Key, ViewCache, ViewData, ViewDescriptor};
use crate::domain::entities::BoardListing;

use super::{render_markup, unexpected_shape};

const FAMILY: &str = "catalog";

/// Every thread OP of a board (or of all boards) on one page.
pub struct CatalogView {
    repo: Arc<dyn ThreadsRepo>,
    renderer: Option<Arc<dyn MarkupRenderer>>,
}

impl CatalogView {
    pub fn new(repo: Arc<dyn ThreadsRepo>, renderer: Option<Arc<dyn MarkupRenderer>>) -> Self {
        Self { repo, renderer }
    }
}

#[async_trait]
impl ViewDescriptor for CatalogView {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn counter(&self, _cache: &ViewCache, key: &Key) -> Result<u64, CacheError> {
        Ok(self.repo.board_counter(key.board_scope()).await?)
    }

    async fn fresh(&self, _cache: &ViewCache, key: &Key) -> Result<ViewData, CacheError> {
        let threads = self.repo.catalog(key.board_scope()).await?;
        Ok(ViewData::Listing(BoardListing {
            threads,
            pages: None,
        }))
    }

    fn render(&self, data: &ViewData, encoded: &Bytes) -> Result<Option<Bytes>, CacheError> {
        let listing = data
            .as_listing()
            .ok_or_else(|| unexpected_shape(FAMILY, "listing"))?;
        render_markup(self.renderer.as_ref(), |renderer| {
            renderer.catalog(&listing.threads, encoded)
        })
    }
}
