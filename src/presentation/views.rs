//! Askama views for the thread, catalog and board index pages.

use askama::{Error as AskamaError, Template};
use time::format_description::well_known::Rfc3339;

use crate::application::markup::{MarkupRenderer, RenderError};
use crate::domain::entities::{BoardListing, Post, Thread};

const ANONYMOUS: &str = "Anonymous";

#[derive(Clone)]
pub struct PostView {
    pub id: u64,
    pub name: String,
    pub time: String,
    pub body: String,
}

impl PostView {
    fn build(view: &'static str, post: &Post) -> Result<Self, RenderError> {
        let time = post
            .time
            .format(&Rfc3339)
            .map_err(|err| RenderError::new(view, format!("invalid post time: {err}")))?;

        Ok(Self {
            id: post.id,
            name: post.name.clone().unwrap_or_else(|| ANONYMOUS.to_string()),
            time,
            body: post.body.clone(),
        })
    }
}

/// A thread as laid out on thread and index pages. `posts` starts with the
/// opening post.
#[derive(Clone)]
pub struct ThreadMarkupView {
    pub id: u64,
    pub board: String,
    pub subject: String,
    pub href: String,
    pub post_count: u32,
    pub image_count: u32,
    pub abbrev: bool,
    pub posts: Vec<PostView>,
}

impl ThreadMarkupView {
    fn build(view: &'static str, thread: &Thread) -> Result<Self, RenderError> {
        let mut posts = Vec::with_capacity(thread.posts.len() + 1);
        posts.push(PostView::build(view, &thread.op)?);
        for post in &thread.posts {
            posts.push(PostView::build(view, post)?);
        }

        Ok(Self {
            id: thread.id,
            board: thread.board.clone(),
            subject: thread.subject.clone(),
            href: thread_href(thread),
            post_count: thread.post_count,
            image_count: thread.image_count,
            abbrev: thread.abbrev,
            posts,
        })
    }
}

#[derive(Clone)]
pub struct CatalogEntryView {
    pub href: String,
    pub subject: String,
    pub post_count: u32,
    pub image_count: u32,
    pub body: String,
}

impl From<&Thread> for CatalogEntryView {
    fn from(thread: &Thread) -> Self {
        Self {
            href: thread_href(thread),
            subject: thread.subject.clone(),
            post_count: thread.post_count,
            image_count: thread.image_count,
            body: thread.op.body.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "thread.html")]
pub struct ThreadTemplate {
    pub title: String,
    pub json: String,
    pub thread: ThreadMarkupView,
}

#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogTemplate {
    pub title: String,
    pub json: String,
    pub entries: Vec<CatalogEntryView>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub json: String,
    pub threads: Vec<ThreadMarkupView>,
    pub pages: Vec<usize>,
}

fn thread_href(thread: &Thread) -> String {
    format!("/{}/{}", thread.board, thread.id)
}

/// JSON safe to place inside a `<script>` element.
fn embed_json(view: &'static str, json: &[u8]) -> Result<String, RenderError> {
    let json = std::str::from_utf8(json)
        .map_err(|err| RenderError::new(view, format!("view JSON is not UTF-8: {err}")))?;
    Ok(json.replace('<', "\\u003c"))
}

fn render<T: Template>(view: &'static str, template: T) -> Result<String, RenderError> {
    template
        .render()
        .map_err(|err: AskamaError| RenderError::new(view, err.to_string()))
}

/// Server-side renderer backed by the askama templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl MarkupRenderer for TemplateRenderer {
    fn thread(&self, thread: &Thread, json: &[u8]) -> Result<String, RenderError> {
        const VIEW: &str = "thread";
        let title = if thread.subject.is_empty() {
            format!("/{}/ - {}", thread.board, thread.id)
        } else {
            format!("/{}/ - {}", thread.board, thread.subject)
        };

        render(
            VIEW,
            ThreadTemplate {
                title,
                json: embed_json(VIEW, json)?,
                thread: ThreadMarkupView::build(VIEW, thread)?,
            },
        )
    }

    fn catalog(&self, threads: &[Thread], json: &[u8]) -> Result<String, RenderError> {
        const VIEW: &str = "catalog";
        render(
            VIEW,
            CatalogTemplate {
                title: "Catalog".to_string(),
                json: embed_json(VIEW, json)?,
                entries: threads.iter().map(CatalogEntryView::from).collect(),
            },
        )
    }

    fn index(&self, page: &BoardListing, json: &[u8]) -> Result<String, RenderError> {
        const VIEW: &str = "index";
        let threads = page
            .threads
            .iter()
            .map(|thread| ThreadMarkupView::build(VIEW, thread))
            .collect::<Result<Vec<_>, _>>()?;

        render(
            VIEW,
            IndexTemplate {
                title: "Board index".to_string(),
                json: embed_json(VIEW, json)?,
                threads,
                pages: (0..page.pages.unwrap_or(1)).collect(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn post(id: u64, body: &str) -> Post {
        Post {
            id,
            time: datetime!(2024-01-01 00:00 UTC),
            name: None,
            body: body.to_string(),
        }
    }

    fn thread() -> Thread {
        Thread {
            id: 1,
            board: "a".to_string(),
            subject: "Hello <world>".to_string(),
            post_count: 2,
            image_count: 0,
            reply_time: datetime!(2024-01-01 00:00 UTC),
            bump_time: datetime!(2024-01-01 00:00 UTC),
            abbrev: false,
            op: post(1, "first"),
            posts: vec![post(2, "</script><b>reply</b>")],
        }
    }

    #[test]
    fn thread_markup_escapes_content() {
        let html = TemplateRenderer.thread(&thread(), b"{}").unwrap();
        assert!(html.contains("Hello &#60;world&#62;") || html.contains("Hello &lt;world&gt;"));
        assert!(!html.contains("<b>reply</b>"));
        assert!(html.contains("id=\"p2\""));
        assert!(html.contains("Anonymous"));
    }

    #[test]
    fn embedded_json_can_not_close_the_script() {
        let html = TemplateRenderer
            .thread(&thread(), br#"{"body":"</script>"}"#)
            .unwrap();
        assert!(html.contains(r#"{"body":"\u003c/script>"}"#));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn index_links_every_page() {
        let listing = BoardListing {
            threads: vec![thread()],
            pages: Some(3),
        };
        let html = TemplateRenderer.index(&listing, b"{}").unwrap();
        assert!(html.contains("href=\"?page=0\""));
        assert!(html.contains("href=\"?page=2\""));
        assert!(!html.contains("href=\"?page=3\""));
        assert!(html.contains("href=\"/a/1\""));
    }

    #[test]
    fn catalog_lists_opening_posts() {
        let html = TemplateRenderer.catalog(&[thread()], b"[]").unwrap();
        assert!(html.contains("first"));
        assert!(!html.contains("reply"));
    }

    #[test]
    fn invalid_utf8_json_is_a_render_error() {
        let err = TemplateRenderer.catalog(&[], &[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.view, "catalog");
    }
}
