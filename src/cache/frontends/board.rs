use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::future::try_join_all;

use crate::application::repos::ThreadsRepo;
use crate::cache::{CacheError, Key, ViewCache, ViewData, ViewDescriptor};
use crate::domain::entities::{BoardListing, PageStore, Thread};

use super::{ThreadView, unexpected_shape};

const FAMILY: &str = "board";

/// Threads shown on one board index page.
pub const THREADS_PER_PAGE: usize = 15;

/// Replies kept per thread on board index pages.
pub const PREVIEW_REPLIES: u32 = 5;

/// The full paginated index of a board, assembled from cached thread
/// previews.
pub struct BoardView {
    repo: Arc<dyn ThreadsRepo>,
    threads: Arc<ThreadView>,
    hide_nsfw: bool,
}

impl BoardView {
    pub fn new(repo: Arc<dyn ThreadsRepo>, threads: Arc<ThreadView>, hide_nsfw: bool) -> Self {
        Self {
            repo,
            threads,
            hide_nsfw,
        }
    }

    async fn hidden_boards(&self, key: &Key) -> Result<Option<HashSet<String>>, CacheError> {
        if self.hide_nsfw && key.board_scope().is_all() {
            Ok(Some(self.repo.nsfw_boards().await?))
        } else {
            Ok(None)
        }
    }

    async fn previews(&self, cache: &ViewCache, ids: &[u64]) -> Result<Vec<Thread>, CacheError> {
        let descriptor: Arc<dyn ViewDescriptor> = self.threads.clone();
        let views = try_join_all(ids.iter().map(|&id| {
            cache.fetch_or_build(Key::thread(id, PREVIEW_REPLIES), Arc::clone(&descriptor))
        }))
        .await?;

        views
            .iter()
            .map(|view| {
                view.data()
                    .as_thread()
                    .cloned()
                    .ok_or_else(|| unexpected_shape(FAMILY, "thread"))
            })
            .collect()
    }
}

#[async_trait]
impl ViewDescriptor for BoardView {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn counter(&self, _cache: &ViewCache, key: &Key) -> Result<u64, CacheError> {
        Ok(self.repo.board_counter(key.board_scope()).await?)
    }

    async fn fresh(&self, cache: &ViewCache, key: &Key) -> Result<ViewData, CacheError> {
        let ids = self.repo.thread_ids(key.board_scope()).await?;
        let hidden = self.hidden_boards(key).await?;

        let mut pages: Vec<Vec<Thread>> = Vec::with_capacity(ids.len() / THREADS_PER_PAGE + 1);
        // Pages follow the unfiltered ids, so a fully hidden chunk still
        // leaves an empty page behind and later page numbers stay put.
        for chunk in ids.chunks(THREADS_PER_PAGE) {
            let mut threads = self.previews(cache, chunk).await?;
            if let Some(hidden) = hidden.as_ref() {
                threads.retain(|thread| !hidden.contains(&thread.board));
            }
            pages.push(threads);
        }

        // An empty board still has one (empty) page.
        if pages.is_empty() {
            pages.push(Vec::new());
        }

        let total = pages.len();
        let stores = pages
            .into_iter()
            .enumerate()
            .map(|(page_number, threads)| -> Result<PageStore, CacheError> {
                let data = BoardListing {
                    threads,
                    pages: Some(total),
                };
                let json = Bytes::from(serde_json::to_vec(&data)?);
                Ok(PageStore {
                    page_number,
                    json,
                    data,
                })
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        Ok(ViewData::Pages(stores))
    }

    /// Joins the already encoded pages into a JSON array.
    fn encode(&self, data: &ViewData) -> Result<Bytes, CacheError> {
        let pages = data
            .as_pages()
            .ok_or_else(|| unexpected_shape(FAMILY, "pages"))?;

        let len = pages.iter().map(|page| page.json.len() + 1).sum::<usize>() + 1;
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u8(b'[');
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                buf.put_u8(b',');
            }
            buf.put_slice(&page.json);
        }
        buf.put_u8(b']');
        Ok(buf.freeze())
    }

    /// Twice the encoded pages, leaving room for the structured copy kept
    /// alongside them.
    fn size(&self, data: &ViewData, _encoded: &Bytes, _markup: Option<&Bytes>) -> usize {
        data.as_pages()
            .map(|pages| pages.iter().map(|page| page.json.len() * 2).sum())
            .unwrap_or_default()
    }
}
