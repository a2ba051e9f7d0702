//! View descriptors for every page type served from the cache.

mod board;
mod board_page;
mod catalog;
mod thread;

use std::sync::Arc;

use bytes::Bytes;

pub use board::{BoardView, PREVIEW_REPLIES, THREADS_PER_PAGE};
pub use board_page::BoardPageView;
pub use catalog::CatalogView;
pub use thread::ThreadView;

use crate::application::markup::{MarkupRenderer, RenderError};
use crate::application::repos::ThreadsRepo;

use super::config::CacheConfig;
use super::error::CacheError;

/// The process-wide descriptor set, built once at startup.
#[derive(Clone)]
pub struct Frontends {
    pub thread: Arc<ThreadView>,
    pub catalog: Arc<CatalogView>,
    pub board: Arc<BoardView>,
    pub board_page: Arc<BoardPageView>,
}

impl Frontends {
    /// Wire the descriptors. Without a renderer every view is API-only.
    pub fn new(
        repo: Arc<dyn ThreadsRepo>,
        renderer: Option<Arc<dyn MarkupRenderer>>,
        config: &CacheConfig,
    ) -> Self {
        let thread = Arc::new(ThreadView::new(Arc::clone(&repo), renderer.clone()));
        let catalog = Arc::new(CatalogView::new(Arc::clone(&repo), renderer.clone()));
        let board = Arc::new(BoardView::new(
            repo,
            Arc::clone(&thread),
            config.hide_nsfw,
        ));
        let board_page = Arc::new(BoardPageView::new(Arc::clone(&board), renderer));

        Self {
            thread,
            catalog,
            board,
            board_page,
        }
    }
}

fn render_markup(
    renderer: Option<&Arc<dyn MarkupRenderer>>,
    render: impl FnOnce(&dyn MarkupRenderer) -> Result<String, RenderError>,
) -> Result<Option<Bytes>, CacheError> {
    match renderer {
        Some(renderer) => Ok(Some(Bytes::from(render(renderer.as_ref())?))),
        None => Ok(None),
    }
}

fn unexpected_shape(family: &'static str, expected: &'static str) -> CacheError {
    CacheError::UnexpectedShape { family, expected }
}
