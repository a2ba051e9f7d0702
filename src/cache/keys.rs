//! Cache key definitions.
//!
//! [`Key`] names one view of the data; [`ViewKey`] pairs it with the view
//! family that renders it, which is what the store is indexed by.

use std::fmt;

use crate::domain::board::BoardScope;

/// Identifies one cacheable view.
///
/// Keys are immutable value objects compared by value. A thread id of `0`
/// means "no specific thread", a `last_n` of `0` means the full thread, and
/// a `page` of `None` addresses the whole unpaginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    board: BoardScope,
    thread: u64,
    last_n: u32,
    page: Option<u32>,
}

impl Key {
    /// A thread, optionally truncated to its last `last_n` replies.
    pub fn thread(id: u64, last_n: u32) -> Self {
        Self {
            board: BoardScope::All,
            thread: id,
            last_n,
            page: None,
        }
    }

    pub fn catalog(board: BoardScope) -> Self {
        Self {
            board,
            thread: 0,
            last_n: 0,
            page: None,
        }
    }

    /// Every page of a board index.
    pub fn board(board: BoardScope) -> Self {
        Self::catalog(board)
    }

    /// A single zero-indexed page of a board index.
    pub fn board_page(board: BoardScope, page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::board(board)
        }
    }

    pub fn board_scope(&self) -> &BoardScope {
        &self.board
    }

    pub fn thread_id(&self) -> u64 {
        self.thread
    }

    pub fn last_n(&self) -> u32 {
        self.last_n
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    /// The same key addressing the whole collection instead of one page.
    pub fn without_page(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.board)?;
        if self.thread != 0 {
            write!(f, "{}", self.thread)?;
        }
        if self.last_n != 0 {
            write!(f, "?last={}", self.last_n)?;
        }
        if let Some(page) = self.page {
            write!(f, "#page{page}")?;
        }
        Ok(())
    }
}

/// Store index: the view family name plus the key within that family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub family: &'static str,
    pub key: Key,
}

impl ViewKey {
    pub fn new(family: &'static str, key: Key) -> Self {
        Self { family, key }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.key)
    }
}
