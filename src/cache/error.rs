use thiserror::Error;

use crate::application::{markup::RenderError, repos::RepoError};

/// Failures surfaced by [`ViewCache::fetch_or_build`](super::ViewCache::fetch_or_build).
///
/// Errors from nested builds (a board pulling its threads, a board page
/// pulling its board) pass through unchanged.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The thread or board does not exist upstream.
    #[error("view not found")]
    NotFound,
    /// The requested board page is past the last page.
    #[error("page {page} not found, board has {pages} page(s)")]
    PageNotFound { page: u32, pages: usize },
    #[error(transparent)]
    Repo(RepoError),
    #[error("failed to encode view: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{family} view received an unexpected payload, expected {expected}")]
    UnexpectedShape {
        family: &'static str,
        expected: &'static str,
    },
    #[error("invalid key for {family} view: {reason}")]
    InvalidKey {
        family: &'static str,
        reason: &'static str,
    },
    #[error("view build aborted: {0}")]
    BuildAborted(String),
}

impl CacheError {
    /// Whether the caller should answer with a 404 rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::PageNotFound { .. })
    }
}

impl From<RepoError> for CacheError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_not_found_is_not_conflated_with_outages() {
        assert!(CacheError::from(RepoError::NotFound).is_not_found());
        assert!(!CacheError::from(RepoError::Timeout).is_not_found());
        assert!(CacheError::PageNotFound { page: 5, pages: 3 }.is_not_found());
    }
}
