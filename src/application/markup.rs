//! Renderer boundary used by view descriptors on rebuild.

use thiserror::Error;

use crate::domain::entities::{BoardListing, Thread};

#[derive(Debug, Error)]
#[error("failed to render {view} markup: {message}")]
pub struct RenderError {
    pub view: &'static str,
    pub message: String,
}

impl RenderError {
    pub fn new(view: &'static str, message: impl Into<String>) -> Self {
        Self {
            view,
            message: message.into(),
        }
    }
}

/// Turns view payloads into HTML. Implementations must be pure: the same
/// payload and JSON always produce the same markup.
///
/// `json` is the encoded form stored next to the markup, so pages can embed
/// it for client-side hydration.
pub trait MarkupRenderer: Send + Sync {
    fn thread(&self, thread: &Thread, json: &[u8]) -> Result<String, RenderError>;

    fn catalog(&self, threads: &[Thread], json: &[u8]) -> Result<String, RenderError>;

    fn index(&self, page: &BoardListing, json: &[u8]) -> Result<String, RenderError>;
}
