//! Page-rendering seam.
//!
//! Tournament pages are script-rendered, so the crawler never works on
//! raw markup. It asks a renderer exactly two things about a page:
//!
//! - the rendered text of a named region, and
//! - the list of row elements a named region contains, each reduced to
//!   its text plus a few attributes.
//!
//! Keeping the seam this narrow lets tests drive the whole pipeline
//! with canned pages, and keeps the fetch backend swappable.
//!
//! Sessions are stateful navigators: a deck page needs its list view
//! activated before the card sections exist, and a session handles
//! that kind of step internally. Sessions are never shared between
//! workers; every crawl unit and every event walk opens its own.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::FetchResult;

/// Region names the crawler asks renderers about.
pub mod region {
    /// Card section cells of a deck page, one per category.
    pub const CARD_SECTIONS: &str = "card-sections";
    /// Event rows of a result listing page.
    pub const EVENT_ROWS: &str = "event-rows";
    /// Standings rows of an event page.
    pub const RANK_ROWS: &str = "rank-rows";
    /// Date element of an event page.
    pub const EVENT_DATE: &str = "event-date";
    /// Control linking to the next page, on listings and standings.
    pub const NEXT_PAGE: &str = "next-page";
}

/// One row element of a region: rendered text plus selected attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedRow {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl RenderedRow {
    pub fn new(text: impl Into<String>) -> Self {
        RenderedRow {
            text: text.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

/// One navigation session against rendered pages.
#[async_trait]
pub trait RenderSession: Send {
    /// Rendered text of the first element of `region` on `url`.
    async fn region_text(&mut self, url: &str, region: &str) -> FetchResult<String>;

    /// Row elements of `region` on `url`, in document order.
    async fn rows(&mut self, url: &str, region: &str) -> FetchResult<Vec<RenderedRow>>;
}

/// Factory for render sessions.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn open_session(&self) -> FetchResult<Box<dyn RenderSession>>;
}
