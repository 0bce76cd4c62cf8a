//! Tournament deck crawler.
//!
//! Walks the official tournament result listing, fetches every new
//! deck page, parses the card sections, folds print variants onto
//! canonical codes, and files each deck under archetype labels:
//!
//! ```text
//! listing -> targets -> fetch -> parse -> normalize -> classify -> index
//! ```
//!
//! [`CrawlOrchestrator`] drives the pipeline. Pages come in through
//! the [`PageRenderer`] seam, so the whole thing runs against canned
//! pages in tests.
//!
//! ```ignore
//! use deck_crawler::{CardIdentityTable, CrawlConfig, CrawlOrchestrator, HttpRenderer, RuleSet};
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! let orchestrator = CrawlOrchestrator::new(
//!     Arc::new(HttpRenderer::new()),
//!     Arc::new(CardIdentityTable::builtin()),
//!     Arc::new(RuleSet::standard()),
//!     CrawlConfig::default(),
//! );
//! let (index, stats) = orchestrator.run(&HashSet::new()).await?;
//! for (label, count) in index.summary() {
//!     println!("{:>4}  {}", count, label);
//! }
//! ```
//!
//! # Modules
//!
//! - [`classifier`]: data-driven archetype rules
//! - [`config`]: crawl parameters
//! - [`error`]: error types per pipeline stage
//! - [`identity`]: canonical card identities across reprints
//! - [`index`]: label-keyed deck index
//! - [`orchestrator`]: bounded-concurrency crawl driver
//! - [`paginator`]: listing and standings walk
//! - [`parser`]: deck-page grammar
//! - [`renderer`]: page-rendering seam
//! - [`renderers`]: renderer backends
//! - [`testing`]: canned renderers for tests
//! - [`text`]: width folding and integer scraping
//! - [`types`]: core data model

pub mod classifier;
pub mod config;
pub mod error;
pub mod identity;
pub mod index;
pub mod orchestrator;
pub mod paginator;
pub mod parser;
pub mod renderer;
pub mod renderers;
pub mod testing;
pub mod text;
pub mod types;

pub use classifier::{classify, Rule, RuleSet, FALLBACK_LABEL};
pub use config::{deck_url, CrawlConfig, DEFAULT_EVENT_LIST_URL};
pub use error::{ConfigError, CrawlError, FetchError, ParseError};
pub use identity::{normalize_pokemon, translated, CardIdentity, CardIdentityTable};
pub use index::ResultIndex;
pub use orchestrator::{merge_staged, ClassifiedDeck, CrawlOrchestrator, CrawlStats};
pub use paginator::collect_targets;
pub use parser::{parse_deck_sections, DeckSections};
pub use renderer::{PageRenderer, RenderSession, RenderedRow};
pub use renderers::HttpRenderer;
pub use types::{CardCategory, CardGroup, CrawlTarget, DeckRecord};
