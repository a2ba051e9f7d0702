//! Repository traits describing persistence adapters.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::board::BoardScope;
use crate::domain::entities::Thread;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("stored data is invalid: {message}")]
    InvalidData { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

/// Read access to threads and the freshness counters that guard cached views.
///
/// Counter lookups are expected to be cheap index reads, while the remaining
/// methods may run large joins. Counters never decrease for a given thread or
/// board unless content is removed.
#[async_trait]
pub trait ThreadsRepo: Send + Sync {
    /// Latest modification of any live post in the thread.
    async fn thread_counter(&self, id: u64) -> Result<u64, RepoError>;

    /// Latest modification of any live post on the board, or on every board
    /// for [`BoardScope::All`].
    async fn board_counter(&self, board: &BoardScope) -> Result<u64, RepoError>;

    /// Load a thread. A non-zero `last_n` keeps only the last `last_n` replies.
    async fn thread(&self, id: u64, last_n: u32) -> Result<Thread, RepoError>;

    /// Thread OPs of the board, most recently replied first.
    async fn catalog(&self, board: &BoardScope) -> Result<Vec<Thread>, RepoError>;

    /// Thread ids of the board, most recently replied first.
    async fn thread_ids(&self, board: &BoardScope) -> Result<Vec<u64>, RepoError>;

    /// Boards whose threads are hidden from `/all/` when NSFW hiding is on.
    async fn nsfw_boards(&self) -> Result<HashSet<String>, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}
