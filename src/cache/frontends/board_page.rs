use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::application::markup::MarkupRenderer;
use crate::cache::{CacheError, Key, ViewCache, ViewData, ViewDescriptor};

use super::{BoardView, render_markup, unexpected_shape};

const FAMILY: &str = "board_page";

/// One page of a board index, cached and evicted on its own.
///
/// The payload and JSON are shared with the parent board entry; only the
/// rendered markup belongs to this entry.
pub struct BoardPageView {
    board: Arc<BoardView>,
    renderer: Option<Arc<dyn MarkupRenderer>>,
}

impl BoardPageView {
    pub fn new(board: Arc<BoardView>, renderer: Option<Arc<dyn MarkupRenderer>>) -> Self {
        Self { board, renderer }
    }
}

#[async_trait]
impl ViewDescriptor for BoardPageView {
    fn family(&self) -> &'static str {
        FAMILY
    }

    /// Counters are board-wide, so the page number plays no part.
    async fn counter(&self, cache: &ViewCache, key: &Key) -> Result<u64, CacheError> {
        self.board.counter(cache, &key.without_page()).await
    }

    async fn fresh(&self, cache: &ViewCache, key: &Key) -> Result<ViewData, CacheError> {
        let page = key.page().ok_or(CacheError::InvalidKey {
            family: FAMILY,
            reason: "page number is required",
        })?;

        let board = cache
            .fetch_or_build(key.without_page(), self.board.clone())
            .await?;
        let pages = board
            .data()
            .as_pages()
            .ok_or_else(|| unexpected_shape(FAMILY, "pages"))?;

        let store = usize::try_from(page)
            .ok()
            .and_then(|index| pages.get(index))
            .ok_or(CacheError::PageNotFound {
                page,
                pages: pages.len(),
            })?;

        Ok(ViewData::Page(store.clone()))
    }

    /// Pages arrive already encoded by the board build.
    fn encode(&self, data: &ViewData) -> Result<Bytes, CacheError> {
        data.as_page()
            .map(|page| page.json.clone())
            .ok_or_else(|| unexpected_shape(FAMILY, "page"))
    }

    fn render(&self, data: &ViewData, encoded: &Bytes) -> Result<Option<Bytes>, CacheError> {
        let page = data
            .as_page()
            .ok_or_else(|| unexpected_shape(FAMILY, "page"))?;
        render_markup(self.renderer.as_ref(), |renderer| {
            renderer.index(&page.data, encoded)
        })
    }

    fn size(&self, _data: &ViewData, _encoded: &Bytes, markup: Option<&Bytes>) -> usize {
        markup.map_or(0, Bytes::len)
    }
}
