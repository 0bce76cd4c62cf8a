//! Crawl configuration.
//!
//! One [`CrawlConfig`] is built at startup and passed by shared
//! reference through the whole crawl; nothing mutates it afterwards.

use std::time::Duration;

/// First page of the official tournament result listing.
pub const DEFAULT_EVENT_LIST_URL: &str = "https://players.pokemon-card.com/event/result/list";

/// Deck page URL for a deck code.
pub fn deck_url(deck_code: &str) -> String {
    format!(
        "https://www.pokemon-card.com/deck/confirm.html/deckID/{}/",
        deck_code
    )
}

/// Crawl parameters.
///
/// Page limits share one convention: negative walks every page, zero
/// walks none, positive `n` walks at most `n`.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// First result listing page.
    pub event_list_url: String,
    /// Substring an event title must carry to be harvested.
    pub event_title_pattern: String,
    /// Listing pages to walk.
    pub result_page_limit: i32,
    /// Events to harvest across all listing pages.
    pub event_limit: usize,
    /// Standings pages to walk per event.
    pub deck_page_limit: i32,
    /// Concurrent deck units in flight.
    pub concurrency: usize,
    /// Budget for one fetch-to-classify unit.
    pub unit_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig {
            event_list_url: DEFAULT_EVENT_LIST_URL.to_string(),
            event_title_pattern: "シティリーグ".to_string(),
            result_page_limit: 10,
            event_limit: 100,
            deck_page_limit: 1,
            concurrency: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(4),
            unit_timeout: Duration::from_secs(60),
        }
    }
}

impl CrawlConfig {
    pub fn new(event_list_url: impl Into<String>) -> Self {
        CrawlConfig {
            event_list_url: event_list_url.into(),
            ..Default::default()
        }
    }

    pub fn with_event_title_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.event_title_pattern = pattern.into();
        self
    }

    pub fn with_result_page_limit(mut self, limit: i32) -> Self {
        self.result_page_limit = limit;
        self
    }

    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit;
        self
    }

    pub fn with_deck_page_limit(mut self, limit: i32) -> Self {
        self.deck_page_limit = limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }
}
