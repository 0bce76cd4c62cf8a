//! Canned renderers for tests.
//!
//! [`MockRenderer`] serves pre-built pages keyed by URL, so pipeline
//! tests run without network access. Unknown URLs answer like a dead
//! page (HTTP 404) and URLs marked failing answer with a timeout,
//! which is enough to exercise every failure path the crawler has.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::renderer::{PageRenderer, RenderSession, RenderedRow};

/// One canned page: rows per region name.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    regions: HashMap<String, Vec<RenderedRow>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, region: impl Into<String>, rows: Vec<RenderedRow>) -> Self {
        self.regions.insert(region.into(), rows);
        self
    }

    /// Shorthand for a region holding a single text-only row.
    pub fn with_text(self, region: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_rows(region, vec![RenderedRow::new(text)])
    }
}

/// In-memory [`PageRenderer`] with canned pages.
#[derive(Debug, Default)]
pub struct MockRenderer {
    pages: Arc<RwLock<HashMap<String, MockPage>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    sessions_opened: Arc<RwLock<usize>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: impl Into<String>, page: MockPage) {
        self.pages.write().unwrap().insert(url.into(), page);
    }

    pub fn with_page(self, url: impl Into<String>, page: MockPage) -> Self {
        self.add_page(url, page);
        self
    }

    /// Make every request for `url` fail with a timeout.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.failing.write().unwrap().insert(url.into());
    }

    pub fn with_failing_url(self, url: impl Into<String>) -> Self {
        self.fail_url(url);
        self
    }

    /// How many sessions have been opened so far.
    pub fn sessions_opened(&self) -> usize {
        *self.sessions_opened.read().unwrap()
    }
}

impl Clone for MockRenderer {
    fn clone(&self) -> Self {
        MockRenderer {
            pages: Arc::clone(&self.pages),
            failing: Arc::clone(&self.failing),
            sessions_opened: Arc::clone(&self.sessions_opened),
        }
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn open_session(&self) -> FetchResult<Box<dyn RenderSession>> {
        *self.sessions_opened.write().unwrap() += 1;
        Ok(Box::new(MockSession {
            renderer: self.clone(),
        }))
    }
}

struct MockSession {
    renderer: MockRenderer,
}

#[async_trait]
impl RenderSession for MockSession {
    async fn region_text(&mut self, url: &str, region: &str) -> FetchResult<String> {
        let rows = self.rows(url, region).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.text),
            None => Err(FetchError::MissingRegion {
                region: region.to_string(),
                url: url.to_string(),
            }),
        }
    }

    async fn rows(&mut self, url: &str, region: &str) -> FetchResult<Vec<RenderedRow>> {
        if self.renderer.failing.read().unwrap().contains(url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        let pages = self.renderer.pages.read().unwrap();
        match pages.get(url) {
            Some(page) => Ok(page.regions.get(region).cloned().unwrap_or_default()),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
