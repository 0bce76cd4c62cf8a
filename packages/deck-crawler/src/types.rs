//! Core data types shared across the crawl pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The five card sections a deck sheet renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    Pokemon,
    Tool,
    Supporter,
    Stadium,
    Energy,
}

impl CardCategory {
    /// All categories, in sheet order.
    pub const ALL: [CardCategory; 5] = [
        CardCategory::Pokemon,
        CardCategory::Tool,
        CardCategory::Supporter,
        CardCategory::Stadium,
        CardCategory::Energy,
    ];

    /// The heading text the official site renders for this section.
    pub fn heading(&self) -> &'static str {
        match self {
            CardCategory::Pokemon => "ポケモン",
            CardCategory::Tool => "グッズ",
            CardCategory::Supporter => "サポート",
            CardCategory::Stadium => "スタジアム",
            CardCategory::Energy => "エネルギー",
        }
    }

    /// Category for a rendered heading text.
    pub fn from_heading(heading: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.heading() == heading)
    }
}

/// Card identity keys mapped to copy counts within one section.
///
/// Counts are strictly positive; adding an existing key sums counts.
/// Pokemon keys are composite (`name\nexpansion collector`), the other
/// sections key by bare name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardGroup(pub HashMap<String, u32>);

impl CardGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `copies` of `key`, summing with any existing entry.
    pub fn add(&mut self, key: impl Into<String>, copies: u32) {
        if copies == 0 {
            return;
        }
        *self.0.entry(key.into()).or_insert(0) += copies;
    }

    /// Copies recorded under `key`, zero when absent.
    pub fn count(&self, key: &str) -> u32 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Total cards in the group (sum of copies).
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u32)> {
        self.0.iter()
    }
}

impl FromIterator<(String, u32)> for CardGroup {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut group = CardGroup::new();
        for (key, copies) in iter {
            group.add(key, copies);
        }
        group
    }
}

/// One deck sheet queued for crawling, with the event context it came
/// from. Consumed exactly once by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub url: String,
    pub deck_code: String,
    /// Final standing, reconciled across rank-table pages.
    pub rank: u32,
    /// Event date as rendered on the event page.
    pub date: String,
    /// Prefecture extracted from the venue address.
    pub region: String,
    /// Declared entry capacity, when the rendered text was unambiguous.
    pub participants: Option<u32>,
}

/// Immutable snapshot of one crawled deck.
///
/// Built once per crawl unit after parse and normalization; never
/// mutated afterward. Reclassification constructs new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRecord {
    pub url: String,
    pub deck_code: String,
    pub rank: u32,
    pub date: String,
    pub region: String,
    pub participants: Option<u32>,
    pub pokemons: CardGroup,
    pub tools: CardGroup,
    pub supporters: CardGroup,
    pub stadiums: CardGroup,
    pub energies: CardGroup,
    pub fetched_at: DateTime<Utc>,
}

impl DeckRecord {
    /// Section group for `category`.
    pub fn group(&self, category: CardCategory) -> &CardGroup {
        match category {
            CardCategory::Pokemon => &self.pokemons,
            CardCategory::Tool => &self.tools,
            CardCategory::Supporter => &self.supporters,
            CardCategory::Stadium => &self.stadiums,
            CardCategory::Energy => &self.energies,
        }
    }

    /// Total cards across all five sections.
    pub fn total_cards(&self) -> u32 {
        CardCategory::ALL
            .iter()
            .map(|&category| self.group(category).total())
            .sum()
    }
}
