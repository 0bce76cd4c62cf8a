//! Canonical card identities across reprints.
//!
//! The same card ships under several print codes (regular, full-art,
//! secret). Archetype statistics only work when every print of a card
//! lands on one canonical code, so the crawler folds print variants
//! through a table loaded once at startup and treated as read-only for
//! the process lifetime. The table is a plain JSON document; new prints
//! ship as data, not code.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::types::CardGroup;

const BUILTIN_TABLE: &str = include_str!("../assets/card_identity.json");

/// One card name's identity entry.
///
/// Each inner list of `code_groups` is one distinct card; its first code
/// is the canonical print. A name carries several groups when unrelated
/// cards share it, which is why lookups always pair name with code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardIdentity {
    /// Name in the display language.
    pub display_name: String,
    /// Groups of equivalent print codes, canonical code first.
    #[serde(default)]
    pub code_groups: Vec<Vec<String>>,
}

/// Read-only lookup from source-language card name to identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardIdentityTable(pub HashMap<String, CardIdentity>);

impl CardIdentityTable {
    /// The identity table shipped with the crate.
    pub fn builtin() -> Self {
        // Static input, checked by tests.
        Self::from_json_str(BUILTIN_TABLE).expect("embedded identity table is valid")
    }

    /// Load and validate a table from a JSON string.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Within one name, code groups must be pairwise disjoint; a code in
    /// two groups would make canonicalization ambiguous.
    fn validate(&self) -> ConfigResult<()> {
        for (name, identity) in &self.0 {
            let mut seen = HashSet::new();
            for group in &identity.code_groups {
                for code in group {
                    if !seen.insert(code.as_str()) {
                        return Err(ConfigError::OverlappingCodeGroups {
                            name: name.clone(),
                            code: code.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Canonical code for a (name, code) pair: the first member of
    /// whichever group contains `code`. Misses return `code` unchanged.
    pub fn canonical_code<'a>(&'a self, name: &str, code: &'a str) -> &'a str {
        self.0
            .get(name)
            .and_then(|identity| {
                identity
                    .code_groups
                    .iter()
                    .find(|group| group.iter().any(|c| c == code))
            })
            .and_then(|group| group.first())
            .map(String::as_str)
            .unwrap_or(code)
    }

    /// Display-language name for `name`, or `name` itself on a miss.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.0
            .get(name)
            .map(|identity| identity.display_name.as_str())
            .unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rewrite every print code in a pokemon group to its canonical form.
///
/// Keys are `name\ncode`; entries landing on the same canonical key
/// merge additively, so the group total is conserved. Pure and
/// deterministic; canonical keys map to themselves, which makes the
/// operation idempotent.
pub fn normalize_pokemon(group: &CardGroup, table: &CardIdentityTable) -> CardGroup {
    let mut normalized = CardGroup::new();
    for (key, &copies) in group.iter() {
        match key.split_once('\n') {
            Some((name, code)) => {
                let canonical = table.canonical_code(name, code);
                normalized.add(format!("{}\n{}", name, canonical), copies);
            }
            None => normalized.add(key.clone(), copies),
        }
    }
    normalized
}

/// Rewrite keys to display-language names, keeping any code part.
///
/// Names colliding after translation merge additively; the group total
/// is conserved. Names absent from the table pass through unchanged.
pub fn translated(group: &CardGroup, table: &CardIdentityTable) -> CardGroup {
    let mut out = CardGroup::new();
    for (key, &copies) in group.iter() {
        match key.split_once('\n') {
            Some((name, code)) => {
                out.add(format!("{}\n{}", table.display_name(name), code), copies);
            }
            None => out.add(table.display_name(key).to_string(), copies),
        }
    }
    out
}
