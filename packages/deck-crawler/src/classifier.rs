//! Data-driven archetype classification.
//!
//! A rule set is an ordered list of tagged rule units, evaluated
//! against one deck at a time:
//!
//! - Rules append labels; a deck straddling two archetypes keeps both.
//! - Evaluation order is the rule list order, so label order is stable
//!   for a given rule set.
//! - A deck matching nothing gets the `others` sentinel so every deck
//!   lands somewhere in the index.
//!
//! Rule sets are plain JSON documents; tuning thresholds or adding an
//! archetype is a data change. [`RuleSet::standard`] ships the current
//! tournament meta.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::identity::CardIdentityTable;
use crate::types::{CardGroup, DeckRecord};

/// Sentinel label for decks no rule claims.
pub const FALLBACK_LABEL: &str = "others";

lazy_static! {
    static ref BASIC_ENERGY_RE: Regex = Regex::new(r"^基本(.)エネルギー").unwrap();
}

/// A card the deck must carry, with a minimum copy count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRequirement {
    pub name: String,
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_copies() -> u32 {
    1
}

/// One arm of a [`Rule::Conditional`]: if `when` is present, emit `label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub when: String,
    pub label: String,
}

/// One classification rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Emit `label` when every requirement is met and nothing in
    /// `absent` is present.
    Presence {
        requires: Vec<CardRequirement>,
        #[serde(default)]
        absent: Vec<String>,
        label: String,
    },
    /// When `root` (and `requires`) are met, emit the label of the
    /// first branch whose `when` card is present, else `fallback`.
    Conditional {
        root: CardRequirement,
        #[serde(default)]
        requires: Vec<CardRequirement>,
        branches: Vec<Branch>,
        #[serde(default)]
        fallback: Option<String>,
    },
    /// When every requirement is met, emit `prefix` followed by the
    /// deck's basic-energy type characters, deduplicated and sorted.
    /// Fires even when the deck runs no basic energy at all.
    EnergySuffix {
        requires: Vec<CardRequirement>,
        prefix: String,
    },
}

/// An ordered rule list, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The rule set for the current tournament meta.
    pub fn standard() -> Self {
        let simple = [
            "ルギアVSTAR",
            "ミュウVMAX",
            "ムゲンダイナVMAX",
            "キュレムVMAX",
            "オリジンパルキアVSTAR",
            "レジエレキVMAX",
            "オリジンディアルガVSTAR",
            "ヒスイ ダイケンキVSTAR",
            "ハピナスV",
            "こくばバドレックスVMAX",
            "プテラVSTAR",
            "ヒスイ ゾロアークVSTAR",
            "ガラル マタドガス",
            "ミュウツーV-UNION",
            "ロトムVSTAR",
            "クロススイッチャー",
            "かがやくムゲンダイナ",
        ];
        let mut rules: Vec<Rule> = simple.iter().map(|name| presence(name)).collect();

        // A single tech copy is common in unrelated decks; two or more
        // marks the archetype.
        rules.push(Rule::Presence {
            requires: vec![need("ルナトーン", 2)],
            absent: vec![],
            label: "ルナトーン".to_string(),
        });

        rules.push(Rule::Conditional {
            root: need("ゾロア", 1),
            requires: vec![],
            branches: vec![branch("ヒスイ ウインディ", "ゾロア_ウインディ")],
            fallback: Some("ゾロア".to_string()),
        });
        rules.push(Rule::Conditional {
            root: need("レジドラゴVSTAR", 1),
            requires: vec![],
            branches: vec![branch("アルセウスVSTAR", "アル_レジドラゴVSTAR")],
            fallback: Some("レジドラゴVSTAR".to_string()),
        });
        rules.push(Rule::Conditional {
            root: need("ギラティナVSTAR", 1),
            requires: vec![],
            branches: vec![branch("キュワワー", "LOST_ギラティナVSTAR")],
            fallback: Some("Other_ギラティナVSTAR".to_string()),
        });

        // The Lost family all hangs off キュワワー.
        rules.push(Rule::Conditional {
            root: need("キュワワー", 1),
            requires: vec![],
            branches: vec![branch("ヤミラミ", "LTB")],
            fallback: Some("Other_Lost".to_string()),
        });
        rules.push(Rule::EnergySuffix {
            requires: vec![
                need("キュワワー", 1),
                need("空の封印石", 1),
                need("かがやくゲッコウガ", 1),
            ],
            prefix: "LTB_空の封印石_".to_string(),
        });
        rules.push(Rule::Presence {
            requires: vec![need("キュワワー", 1), need("空の封印石", 1)],
            absent: vec!["かがやくゲッコウガ".to_string()],
            label: "LTB_空の封印石_other".to_string(),
        });
        rules.push(Rule::Presence {
            requires: vec![need("キュワワー", 1), need("フリーザー", 1)],
            absent: vec!["ヤミラミ".to_string()],
            label: "LTB_ウッウ".to_string(),
        });
        rules.push(Rule::Conditional {
            root: need("かがやくリザードン", 1),
            requires: vec![need("キュワワー", 1)],
            branches: vec![branch("ヤミラミ", "LTB_ヤミラミ_リザードン")],
            fallback: Some("LTB_リザードン".to_string()),
        });
        rules.push(Rule::Presence {
            requires: vec![need("キュワワー", 1), need("カイオーガ", 1)],
            absent: vec![],
            label: "LTB_カイオーガ".to_string(),
        });
        rules.push(Rule::Presence {
            requires: vec![need("キュワワー", 1), need("カイリューV", 1)],
            absent: vec![],
            label: "LTB_カイリュー".to_string(),
        });

        rules.push(Rule::Presence {
            requires: vec![
                need("レジギガス", 1),
                need("レジドラゴ", 1),
                need("レジスチル", 1),
                need("レジロック", 1),
                need("レジアイス", 1),
                need("レジエレキ", 1),
            ],
            absent: vec![],
            label: "レジ".to_string(),
        });
        rules.push(Rule::Conditional {
            root: need("アルセウスVSTAR", 1),
            requires: vec![],
            branches: vec![
                branch("メッソン", "アルセウス裏工作"),
                branch("ジュラルドンVMAX", "アル_ジュラルドン"),
                branch("そらをとぶピカチュウVMAX", "アル_そらをとぶピカチュウ"),
            ],
            fallback: None,
        });

        RuleSet { rules }
    }
}

fn need(name: &str, copies: u32) -> CardRequirement {
    CardRequirement {
        name: name.to_string(),
        copies,
    }
}

fn presence(name: &str) -> Rule {
    Rule::Presence {
        requires: vec![need(name, 1)],
        absent: vec![],
        label: name.to_string(),
    }
}

fn branch(when: &str, label: &str) -> Branch {
    Branch {
        when: when.to_string(),
        label: label.to_string(),
    }
}

/// Requirement lookups over one deck. Pokemon keys carry a print code
/// after the name; requirements match on the name alone and sum across
/// prints. Trainer requirements match the tool group by exact name.
struct DeckView<'a> {
    record: &'a DeckRecord,
}

impl<'a> DeckView<'a> {
    fn copies(&self, name: &str) -> u32 {
        let pokemon: u32 = self
            .record
            .pokemons
            .iter()
            .filter(|(key, _)| key.split('\n').next() == Some(name))
            .map(|(_, &copies)| copies)
            .sum();
        pokemon + self.record.tools.count(name)
    }

    fn has(&self, name: &str) -> bool {
        self.copies(name) > 0
    }

    fn meets(&self, requirement: &CardRequirement) -> bool {
        self.copies(&requirement.name) >= requirement.copies
    }

    fn meets_all(&self, requirements: &[CardRequirement]) -> bool {
        requirements.iter().all(|r| self.meets(r))
    }
}

/// Basic-energy type characters of a deck, deduplicated and sorted.
fn basic_energy_types(energies: &CardGroup) -> String {
    let mut types: Vec<char> = energies
        .iter()
        .filter_map(|(name, _)| BASIC_ENERGY_RE.captures(name))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().chars().next()))
        .collect();
    types.sort_unstable();
    types.dedup();
    types.into_iter().collect()
}

fn apply_rule(rule: &Rule, view: &DeckView) -> Option<String> {
    match rule {
        Rule::Presence {
            requires,
            absent,
            label,
        } => {
            if view.meets_all(requires) && absent.iter().all(|name| !view.has(name)) {
                Some(label.clone())
            } else {
                None
            }
        }
        Rule::Conditional {
            root,
            requires,
            branches,
            fallback,
        } => {
            if view.meets(root) && view.meets_all(requires) {
                branches
                    .iter()
                    .find(|b| view.has(&b.when))
                    .map(|b| b.label.clone())
                    .or_else(|| fallback.clone())
            } else {
                None
            }
        }
        Rule::EnergySuffix { requires, prefix } => {
            if view.meets_all(requires) {
                Some(format!(
                    "{}{}",
                    prefix,
                    basic_energy_types(&view.record.energies)
                ))
            } else {
                None
            }
        }
    }
}

fn push_unique(labels: &mut Vec<String>, label: String) {
    if !labels.iter().any(|l| l == &label) {
        labels.push(label);
    }
}

/// Classify one deck against a rule set.
///
/// Labels come out in rule order, each at most once, with the `others`
/// sentinel when no rule fired. The final step maps each label through
/// the identity table's display names; labels colliding after that
/// mapping also merge.
pub fn classify(record: &DeckRecord, rules: &RuleSet, table: &CardIdentityTable) -> Vec<String> {
    let view = DeckView { record };
    let mut labels = Vec::new();
    for rule in &rules.rules {
        if let Some(label) = apply_rule(rule, &view) {
            push_unique(&mut labels, label);
        }
    }
    if labels.is_empty() {
        labels.push(FALLBACK_LABEL.to_string());
    }

    let mut displayed = Vec::with_capacity(labels.len());
    for label in labels {
        push_unique(&mut displayed, table.display_name(&label).to_string());
    }
    displayed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(entries: &[(&str, u32)]) -> CardGroup {
        entries
            .iter()
            .map(|(name, copies)| (name.to_string(), *copies))
            .collect()
    }

    fn deck(
        pokemons: &[(&str, u32)],
        tools: &[(&str, u32)],
        energies: &[(&str, u32)],
    ) -> DeckRecord {
        DeckRecord {
            url: "https://example.com/deck/abc-123".to_string(),
            deck_code: "abc-123".to_string(),
            rank: 1,
            date: "2023年1月15日(日)".to_string(),
            region: "東京".to_string(),
            participants: Some(32),
            pokemons: group(pokemons),
            tools: group(tools),
            supporters: CardGroup::new(),
            stadiums: CardGroup::new(),
            energies: group(energies),
            fetched_at: Utc::now(),
        }
    }

    fn plain(table: &CardIdentityTable, record: &DeckRecord, rules: &RuleSet) -> Vec<String> {
        classify(record, rules, table)
    }

    #[test]
    fn test_empty_rule_set_yields_sentinel_only() {
        let record = deck(&[("ピカチュウ\nS8b 236/184", 4)], &[], &[]);
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::default());
        assert_eq!(labels, vec![FALLBACK_LABEL.to_string()]);
    }

    #[test]
    fn test_unmatched_deck_falls_through_to_sentinel() {
        let record = deck(&[("コイキング\nS1 001/100", 4)], &[], &[]);
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec![FALLBACK_LABEL.to_string()]);
    }

    #[test]
    fn test_independent_rules_append_in_order() {
        let rules = RuleSet {
            rules: vec![presence("ルギアVSTAR"), presence("かがやくムゲンダイナ")],
        };
        let record = deck(
            &[
                ("かがやくムゲンダイナ\nS11a 042/068", 1),
                ("ルギアVSTAR\nS12 098/098", 4),
            ],
            &[],
            &[],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &rules);
        assert_eq!(labels, vec!["ルギアVSTAR", "かがやくムゲンダイナ"]);
    }

    #[test]
    fn test_threshold_fires_at_exact_count() {
        let table = CardIdentityTable::default();
        let rules = RuleSet::standard();

        let one = deck(&[("ルナトーン\nS12 043/098", 1)], &[], &[]);
        assert_eq!(plain(&table, &one, &rules), vec![FALLBACK_LABEL.to_string()]);

        let two = deck(&[("ルナトーン\nS12 043/098", 2)], &[], &[]);
        assert_eq!(plain(&table, &two, &rules), vec!["ルナトーン"]);
    }

    #[test]
    fn test_threshold_sums_across_prints() {
        let record = deck(
            &[
                ("ルナトーン\nS12 043/098", 1),
                ("ルナトーン\nS9a 032/067", 1),
            ],
            &[],
            &[],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec!["ルナトーン"]);
    }

    #[test]
    fn test_tool_presence_classifies() {
        let record = deck(&[], &[("クロススイッチャー", 4)], &[]);
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec!["クロススイッチャー"]);
    }

    #[test]
    fn test_conditional_branch_and_fallback() {
        let table = CardIdentityTable::default();
        let rules = RuleSet::standard();

        let paired = deck(
            &[("ゾロア\nS10a 043/067", 2), ("ヒスイ ウインディ\nS10a 022/067", 3)],
            &[],
            &[],
        );
        assert_eq!(plain(&table, &paired, &rules), vec!["ゾロア_ウインディ"]);

        let alone = deck(&[("ゾロア\nS10a 043/067", 2)], &[], &[]);
        assert_eq!(plain(&table, &alone, &rules), vec!["ゾロア"]);
    }

    #[test]
    fn test_conditional_branch_order_wins() {
        let record = deck(
            &[
                ("アルセウスVSTAR\nS9 084/100", 3),
                ("メッソン\nS9 021/100", 4),
                ("ジュラルドンVMAX\nS8b 253/184", 2),
            ],
            &[],
            &[],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec!["アルセウス裏工作"]);
    }

    #[test]
    fn test_conditional_without_fallback_stays_silent() {
        let record = deck(&[("アルセウスVSTAR\nS9 084/100", 3)], &[], &[]);
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec![FALLBACK_LABEL.to_string()]);
    }

    #[test]
    fn test_lost_family_splits_on_sableye() {
        let table = CardIdentityTable::default();
        let rules = RuleSet::standard();

        let with_sableye = deck(
            &[("キュワワー\nS11 074/100", 4), ("ヤミラミ\nS11 089/100", 1)],
            &[],
            &[],
        );
        assert_eq!(plain(&table, &with_sableye, &rules), vec!["LTB"]);

        let without = deck(&[("キュワワー\nS11 074/100", 4)], &[], &[]);
        assert_eq!(plain(&table, &without, &rules), vec!["Other_Lost"]);
    }

    #[test]
    fn test_energy_suffix_sorted_and_deduplicated() {
        let table = CardIdentityTable::default();
        let rules = RuleSet::standard();
        let record = deck(
            &[
                ("キュワワー\nS11 074/100", 4),
                ("ヤミラミ\nS11 089/100", 1),
                ("かがやくゲッコウガ\nS10a 018/067", 1),
            ],
            &[("空の封印石", 2)],
            &[
                ("基本超エネルギー", 4),
                ("基本水エネルギー", 3),
                ("基本水エネルギー（キラ）", 1),
            ],
        );
        let labels = plain(&table, &record, &rules);
        assert!(labels.contains(&"LTB_空の封印石_水超".to_string()));
    }

    #[test]
    fn test_energy_suffix_fires_with_no_basic_energy() {
        let record = deck(
            &[
                ("キュワワー\nS11 074/100", 4),
                ("かがやくゲッコウガ\nS10a 018/067", 1),
            ],
            &[("空の封印石", 2)],
            &[("キャプチャーエネルギー", 4)],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert!(labels.contains(&"LTB_空の封印石_".to_string()));
        assert!(!labels.iter().any(|l| l == "LTB_空の封印石_other"));
    }

    #[test]
    fn test_absent_card_vetoes_presence_rule() {
        let record = deck(
            &[("キュワワー\nS11 074/100", 4)],
            &[("空の封印石", 2)],
            &[],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert!(labels.contains(&"LTB_空の封印石_other".to_string()));
        assert!(!labels.iter().any(|l| l.starts_with("LTB_空の封印石_") && l != "LTB_空の封印石_other"));
    }

    #[test]
    fn test_regi_rule_needs_all_six() {
        let table = CardIdentityTable::default();
        let rules = RuleSet::standard();
        let five = deck(
            &[
                ("レジギガス\nS11a 028/068", 2),
                ("レジドラゴ\nS11a 029/068", 1),
                ("レジスチル\nS11a 030/068", 1),
                ("レジロック\nS11a 031/068", 1),
                ("レジアイス\nS11a 032/068", 1),
            ],
            &[],
            &[],
        );
        assert_eq!(plain(&table, &five, &rules), vec![FALLBACK_LABEL.to_string()]);

        let six = deck(
            &[
                ("レジギガス\nS11a 028/068", 2),
                ("レジドラゴ\nS11a 029/068", 1),
                ("レジスチル\nS11a 030/068", 1),
                ("レジロック\nS11a 031/068", 1),
                ("レジアイス\nS11a 032/068", 1),
                ("レジエレキ\nS11a 033/068", 1),
            ],
            &[],
            &[],
        );
        assert_eq!(plain(&table, &six, &rules), vec!["レジ"]);
    }

    #[test]
    fn test_multi_label_deck_keeps_both() {
        let record = deck(
            &[
                ("ギラティナVSTAR\nS11 111/100", 3),
                ("キュワワー\nS11 074/100", 4),
                ("ヤミラミ\nS11 089/100", 1),
            ],
            &[],
            &[],
        );
        let labels = plain(&CardIdentityTable::default(), &record, &RuleSet::standard());
        assert_eq!(labels, vec!["LOST_ギラティナVSTAR", "LTB"]);
    }

    #[test]
    fn test_rule_set_loads_from_json() {
        let rules = RuleSet::from_json_str(
            r#"{
                "rules": [
                    { "type": "presence",
                      "requires": [{ "name": "ルナトーン", "copies": 2 }],
                      "label": "ルナトーン" },
                    { "type": "conditional",
                      "root": { "name": "ゾロア" },
                      "branches": [{ "when": "ヒスイ ウインディ", "label": "ゾロア_ウインディ" }],
                      "fallback": "ゾロア" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(rules.rules.len(), 2);

        let table = CardIdentityTable::default();
        let one = deck(&[("ルナトーン\nS12 043/098", 1)], &[], &[]);
        assert_eq!(plain(&table, &one, &rules), vec![FALLBACK_LABEL.to_string()]);
        let two = deck(&[("ルナトーン\nS12 043/098", 2)], &[], &[]);
        assert_eq!(plain(&table, &two, &rules), vec!["ルナトーン"]);
    }

    #[test]
    fn test_labels_translated_last_and_merged() {
        let table = CardIdentityTable::from_json_str(
            r#"{
                "ルギアVSTAR": { "display_name": "洛奇亚VSTAR" },
                "ロトムVSTAR": { "display_name": "洛奇亚VSTAR" }
            }"#,
        )
        .unwrap();
        let record = deck(
            &[
                ("ルギアVSTAR\nS12 098/098", 4),
                ("ロトムVSTAR\nS12a 051/172", 2),
            ],
            &[],
            &[],
        );
        let labels = classify(&record, &RuleSet::standard(), &table);
        assert_eq!(labels, vec!["洛奇亚VSTAR"]);
    }
}
