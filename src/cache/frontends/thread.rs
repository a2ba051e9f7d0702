use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::application::markup::MarkupRenderer;
use crate::application::repos::ThreadsRepo;
use crate::cache::{CacheError, Key, ViewCache, ViewData, ViewDescriptor};

use super::{render_markup, unexpected_shape};

const FAMILY: &str = "thread";

/// A single thread, in full or truncated to its last replies.
pub struct ThreadView {
    repo: Arc<dyn ThreadsRepo>,
    renderer: Option<Arc<dyn MarkupRenderer>>,
}

impl ThreadView {
    pub fn new(repo: Arc<dyn ThreadsRepo>, renderer: Option<Arc<dyn MarkupRenderer>>) -> Self {
        Self { repo, renderer }
    }
}

fn thread_id(key: &Key) -> Result<u64, CacheError> {
    match key.thread_id() {
        0 => Err(CacheError::InvalidKey {
            family: FAMILY,
            reason: "thread id is required",
        }),
        id => Ok(id),
    }
}

#[async_trait]
impl ViewDescriptor for ThreadView {
    fn family(&self) -> &'static str {
        FAMILY
    }

    async fn counter(&self, _cache: &ViewCache, key: &Key) -> Result<u64, CacheError> {
        Ok(self.repo.thread_counter(thread_id(key)?).await?)
    }

    async fn fresh(&self, _cache: &ViewCache, key: &Key) -> Result<ViewData, CacheError> {
        let thread = self.repo.thread(thread_id(key)?, key.last_n()).await?;
        Ok(ViewData::Thread(thread))
    }

    fn render(&self, data: &ViewData, encoded: &Bytes) -> Result<Option<Bytes>, CacheError> {
        let thread = data
            .as_thread()
            .ok_or_else(|| unexpected_shape(FAMILY, "thread"))?;
        render_markup(self.renderer.as_ref(), |renderer| {
            renderer.thread(thread, encoded)
        })
    }
}
