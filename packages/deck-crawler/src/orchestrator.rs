//! Crawl orchestration.
//!
//! One unit of work covers a single deck: fetch the page, parse its
//! sections, normalize prints, classify. Units fan out under a
//! semaphore, every unit stages its result into one vec under a short
//! lock, and a single writer merges the staging into the index after
//! the last unit has joined. A failed or timed-out unit is logged and
//! dropped; it never aborts the crawl.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use crate::classifier::{classify, RuleSet};
use crate::config::CrawlConfig;
use crate::error::{CrawlResult, FetchResult};
use crate::identity::{normalize_pokemon, CardIdentityTable};
use crate::index::ResultIndex;
use crate::paginator::collect_targets;
use crate::parser::parse_deck_sections;
use crate::renderer::{region, PageRenderer};
use crate::types::{CrawlTarget, DeckRecord};

/// One deck with its labels, staged for the merge.
#[derive(Debug, Clone)]
pub struct ClassifiedDeck {
    pub record: Arc<DeckRecord>,
    pub labels: Vec<String>,
}

/// Outcome counts of one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub targets: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Drives the fetch-parse-normalize-classify pipeline.
pub struct CrawlOrchestrator {
    renderer: Arc<dyn PageRenderer>,
    identity: Arc<CardIdentityTable>,
    rules: Arc<RuleSet>,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        identity: Arc<CardIdentityTable>,
        rules: Arc<RuleSet>,
        config: CrawlConfig,
    ) -> Self {
        CrawlOrchestrator {
            renderer,
            identity,
            rules,
            config,
        }
    }

    /// Collect targets from the listing and crawl them.
    pub async fn run(&self, skip_codes: &HashSet<String>) -> FetchResult<(ResultIndex, CrawlStats)> {
        let targets = collect_targets(self.renderer.as_ref(), &self.config, skip_codes).await?;
        Ok(self.crawl(targets).await)
    }

    /// Crawl the given targets into a fresh index.
    pub async fn crawl(&self, targets: Vec<CrawlTarget>) -> (ResultIndex, CrawlStats) {
        let mut stats = CrawlStats {
            targets: targets.len(),
            ..CrawlStats::default()
        };
        info!(
            targets = stats.targets,
            concurrency = self.config.concurrency,
            "starting deck crawl"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let staged: Arc<Mutex<Vec<ClassifiedDeck>>> = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(stats.targets);
        for target in targets {
            let semaphore = Arc::clone(&semaphore);
            let staged = Arc::clone(&staged);
            let renderer = Arc::clone(&self.renderer);
            let identity = Arc::clone(&self.identity);
            let rules = Arc::clone(&self.rules);
            let unit_timeout = self.config.unit_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                // The timeout covers the unit itself, not the queue wait.
                match tokio::time::timeout(
                    unit_timeout,
                    crawl_unit(renderer.as_ref(), &identity, &rules, &target),
                )
                .await
                {
                    Ok(Ok(deck)) => {
                        // Lock scope is the push only.
                        staged.lock().await.push(deck);
                        true
                    }
                    Ok(Err(error)) => {
                        warn!(deck_code = %target.deck_code, error = %error, "deck unit failed");
                        false
                    }
                    Err(_) => {
                        warn!(deck_code = %target.deck_code, "deck unit timed out");
                        false
                    }
                }
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(true) => stats.completed += 1,
                Ok(false) => stats.failed += 1,
                Err(error) => {
                    warn!(error = %error, "deck unit panicked");
                    stats.failed += 1;
                }
            }
        }

        let staged = std::mem::take(&mut *staged.lock().await);
        let index = merge_staged(staged);
        info!(
            completed = stats.completed,
            failed = stats.failed,
            labels = index.labels().count(),
            "deck crawl finished"
        );
        (index, stats)
    }

    /// Rebuild the index from already-crawled decks, without touching
    /// the network. Pokemon groups are re-normalized first, so an
    /// identity-table change lands alongside a rule change.
    pub fn reclassify(&self, index: &ResultIndex) -> ResultIndex {
        let mut staged = Vec::new();
        for record in index.unique_decks() {
            let pokemons = normalize_pokemon(&record.pokemons, &self.identity);
            let record = if pokemons == record.pokemons {
                record
            } else {
                Arc::new(DeckRecord {
                    pokemons,
                    ..(*record).clone()
                })
            };
            let labels = classify(&record, &self.rules, &self.identity);
            staged.push(ClassifiedDeck { record, labels });
        }
        merge_staged(staged)
    }
}

/// Fetch, parse, normalize and classify one deck.
async fn crawl_unit(
    renderer: &dyn PageRenderer,
    identity: &CardIdentityTable,
    rules: &RuleSet,
    target: &CrawlTarget,
) -> CrawlResult<ClassifiedDeck> {
    let mut session = renderer.open_session().await?;
    let rows = session.rows(&target.url, region::CARD_SECTIONS).await?;
    let texts: Vec<String> = rows.into_iter().map(|row| row.text).collect();
    let sections = parse_deck_sections(&texts)?;

    let record = Arc::new(DeckRecord {
        url: target.url.clone(),
        deck_code: target.deck_code.clone(),
        rank: target.rank,
        date: target.date.clone(),
        region: target.region.clone(),
        participants: target.participants,
        pokemons: normalize_pokemon(&sections.pokemons, identity),
        tools: sections.tools,
        supporters: sections.supporters,
        stadiums: sections.stadiums,
        energies: sections.energies,
        fetched_at: Utc::now(),
    });
    let labels = classify(&record, rules, identity);
    Ok(ClassifiedDeck { record, labels })
}

/// Single-writer merge of staged units into a fresh index.
pub fn merge_staged(staged: Vec<ClassifiedDeck>) -> ResultIndex {
    let mut index = ResultIndex::new();
    for deck in staged {
        for label in &deck.labels {
            index.insert(label, Arc::clone(&deck.record));
        }
    }
    index
}
