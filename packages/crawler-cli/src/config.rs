use anyhow::{Context, Result};
use deck_crawler::{CrawlConfig, DEFAULT_EVENT_LIST_URL};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Crawler configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub event_list_url: String,
    pub event_title_pattern: String,
    pub result_page_limit: i32,
    pub event_limit: usize,
    pub deck_page_limit: i32,
    pub concurrency: Option<usize>,
    pub unit_timeout_secs: u64,
    pub identity_table: Option<String>,
    pub rule_set: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            event_list_url: env::var("EVENT_LIST_URL")
                .unwrap_or_else(|_| DEFAULT_EVENT_LIST_URL.to_string()),
            event_title_pattern: env::var("EVENT_TITLE_PATTERN")
                .unwrap_or_else(|_| "シティリーグ".to_string()),
            result_page_limit: env::var("RESULT_PAGE_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("RESULT_PAGE_LIMIT must be a valid number")?,
            event_limit: env::var("EVENT_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("EVENT_LIMIT must be a valid number")?,
            deck_page_limit: env::var("DECK_PAGE_LIMIT")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("DECK_PAGE_LIMIT must be a valid number")?,
            concurrency: env::var("CONCURRENCY")
                .ok()
                .map(|value| value.parse())
                .transpose()
                .context("CONCURRENCY must be a valid number")?,
            unit_timeout_secs: env::var("UNIT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("UNIT_TIMEOUT_SECS must be a valid number")?,
            identity_table: env::var("CARD_IDENTITY_TABLE").ok(),
            rule_set: env::var("RULE_SET").ok(),
        })
    }

    /// Crawl parameters for the library.
    pub fn crawl_config(&self) -> CrawlConfig {
        let mut config = CrawlConfig::new(self.event_list_url.clone())
            .with_event_title_pattern(self.event_title_pattern.clone())
            .with_result_page_limit(self.result_page_limit)
            .with_event_limit(self.event_limit)
            .with_deck_page_limit(self.deck_page_limit)
            .with_unit_timeout(Duration::from_secs(self.unit_timeout_secs));
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        config
    }
}
