//! Domain entities mirrored from persistent storage.

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: u64,
    #[serde(with = "time::serde::timestamp")]
    pub time: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub body: String,
}

/// A thread with its opening post and (possibly abbreviated) replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub id: u64,
    pub board: String,
    pub subject: String,
    pub post_count: u32,
    pub image_count: u32,
    #[serde(with = "time::serde::timestamp")]
    pub reply_time: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub bump_time: OffsetDateTime,
    /// Set when `posts` only holds the most recent replies.
    pub abbrev: bool,
    pub op: Post,
    pub posts: Vec<Post>,
}

/// Threads shown on a catalog or on one board index page.
///
/// `pages` is only present on board index pages, where it carries the total
/// page count of the board.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoardListing {
    pub threads: Vec<Thread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

/// One page of a board index together with its pre-encoded JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageStore {
    #[serde(skip)]
    pub page_number: usize,
    #[serde(skip)]
    pub json: Bytes,
    #[serde(flatten)]
    pub data: BoardListing,
}
