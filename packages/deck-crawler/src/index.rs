//! Label-keyed deck index.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::types::DeckRecord;

/// Decks grouped under archetype labels.
///
/// A deck may sit under several labels, but never twice under one
/// label. Records are shared by `Arc` so a multi-label deck costs one
/// allocation, and labels live in a `BTreeMap` so iteration order is
/// stable across runs.
#[derive(Debug, Clone, Default)]
pub struct ResultIndex(pub BTreeMap<String, Vec<Arc<DeckRecord>>>);

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `deck` under `label` unless that deck code already sits
    /// there. Returns whether the deck was inserted.
    pub fn insert(&mut self, label: &str, deck: Arc<DeckRecord>) -> bool {
        let decks = self.0.entry(label.to_string()).or_default();
        if decks.iter().any(|d| d.deck_code == deck.deck_code) {
            return false;
        }
        decks.push(deck);
        true
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn decks(&self, label: &str) -> &[Arc<DeckRecord>] {
        self.0.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(label, deck count)` pairs in label order.
    pub fn summary(&self) -> Vec<(&str, usize)> {
        self.0
            .iter()
            .map(|(label, decks)| (label.as_str(), decks.len()))
            .collect()
    }

    /// Every distinct deck, in label order then insertion order.
    pub fn unique_decks(&self) -> Vec<Arc<DeckRecord>> {
        let mut seen = HashSet::new();
        let mut decks = Vec::new();
        for records in self.0.values() {
            for record in records {
                if seen.insert(record.deck_code.clone()) {
                    decks.push(Arc::clone(record));
                }
            }
        }
        decks
    }

    /// Deck codes present anywhere in the index.
    pub fn deck_codes(&self) -> HashSet<String> {
        self.0
            .values()
            .flatten()
            .map(|d| d.deck_code.clone())
            .collect()
    }

    /// Index entries across labels; a deck counts once per label.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CardGroup;
    use chrono::Utc;

    fn record(code: &str) -> Arc<DeckRecord> {
        Arc::new(DeckRecord {
            url: format!("https://example.com/deck/{}", code),
            deck_code: code.to_string(),
            rank: 1,
            date: "2023年1月15日(日)".to_string(),
            region: "東京".to_string(),
            participants: None,
            pokemons: CardGroup::new(),
            tools: CardGroup::new(),
            supporters: CardGroup::new(),
            stadiums: CardGroup::new(),
            energies: CardGroup::new(),
            fetched_at: Utc::now(),
        })
    }

    #[test]
    fn test_duplicate_insert_is_refused() {
        let mut index = ResultIndex::new();
        assert!(index.insert("ルギアVSTAR", record("aaa")));
        assert!(!index.insert("ルギアVSTAR", record("aaa")));
        assert_eq!(index.decks("ルギアVSTAR").len(), 1);
    }

    #[test]
    fn test_same_deck_under_two_labels() {
        let mut index = ResultIndex::new();
        let deck = record("aaa");
        assert!(index.insert("LOST_ギラティナVSTAR", Arc::clone(&deck)));
        assert!(index.insert("LTB", deck));
        assert_eq!(index.len(), 2);
        assert_eq!(index.unique_decks().len(), 1);
    }

    #[test]
    fn test_summary_is_label_ordered() {
        let mut index = ResultIndex::new();
        index.insert("others", record("ccc"));
        index.insert("LTB", record("aaa"));
        index.insert("LTB", record("bbb"));
        assert_eq!(index.summary(), vec![("LTB", 2), ("others", 1)]);
    }

    #[test]
    fn test_deck_codes_spans_labels() {
        let mut index = ResultIndex::new();
        let shared = record("aaa");
        index.insert("LTB", Arc::clone(&shared));
        index.insert("others", record("bbb"));
        index.insert("ルギアVSTAR", shared);
        let codes = index.deck_codes();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("aaa"));
        assert!(codes.contains("bbb"));
    }
}
