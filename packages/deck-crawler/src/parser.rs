//! Deck-page grammar.
//!
//! A rendered deck page is a list of section cells, one per card
//! category. Each cell is newline-separated text:
//!
//! - First line: section heading, `名前 (枚数)` with an ASCII paren and
//!   the declared card total for the section.
//! - Pokemon body: groups of exactly four lines (name, expansion
//!   symbol, collector number, copy count).
//! - Every other body: one line per card, name and copy count split at
//!   the last whitespace.
//!
//! Parsing is strict. Any grammar violation, or a section body whose
//! copies do not sum to the declared total, fails the whole deck; a
//! partially parsed deck would poison archetype counts downstream.

use crate::error::{ParseError, ParseResult};
use crate::types::{CardCategory, CardGroup};

/// Parsed card groups of one deck, keyed by section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckSections {
    pub pokemons: CardGroup,
    pub tools: CardGroup,
    pub supporters: CardGroup,
    pub stadiums: CardGroup,
    pub energies: CardGroup,
}

impl DeckSections {
    fn group_mut(&mut self, category: CardCategory) -> &mut CardGroup {
        match category {
            CardCategory::Pokemon => &mut self.pokemons,
            CardCategory::Tool => &mut self.tools,
            CardCategory::Supporter => &mut self.supporters,
            CardCategory::Stadium => &mut self.stadiums,
            CardCategory::Energy => &mut self.energies,
        }
    }

    /// Total copies across all sections.
    pub fn total(&self) -> u32 {
        self.pokemons.total()
            + self.tools.total()
            + self.supporters.total()
            + self.stadiums.total()
            + self.energies.total()
    }
}

/// Parse the section cells of one deck page.
///
/// Cells that are empty after trimming are skipped; a legal deck may
/// simply lack a section. Sections may arrive in any order but each
/// category at most once.
pub fn parse_deck_sections(section_texts: &[String]) -> ParseResult<DeckSections> {
    let mut sections = DeckSections::default();
    let mut seen: Vec<CardCategory> = Vec::new();

    for text in section_texts {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let (heading, body) = match lines.split_first() {
            Some(split) => split,
            None => continue,
        };

        let (category, declared) = parse_heading(heading)?;
        if seen.contains(&category) {
            return Err(ParseError::DuplicateSection {
                heading: category.heading().to_string(),
            });
        }
        seen.push(category);

        let group = sections.group_mut(category);
        match category {
            CardCategory::Pokemon => parse_pokemon_lines(body, group)?,
            _ => parse_flat_lines(body, group)?,
        }

        let parsed = group.total();
        if parsed != declared {
            return Err(ParseError::CountMismatch {
                section: category.heading().to_string(),
                declared,
                parsed,
            });
        }
    }

    Ok(sections)
}

/// Split `名前 (枚数)` into category and declared total.
fn parse_heading(line: &str) -> ParseResult<(CardCategory, u32)> {
    let missing = || ParseError::MissingHeading {
        snippet: line.chars().take(40).collect(),
    };

    let (name, rest) = line.split_once('(').ok_or_else(missing)?;
    let declared: u32 = rest
        .trim_end_matches(')')
        .trim()
        .parse()
        .map_err(|_| missing())?;
    let category = CardCategory::from_heading(name.trim()).ok_or_else(|| {
        ParseError::UnknownSection {
            heading: name.trim().to_string(),
        }
    })?;
    Ok((category, declared))
}

/// Pokemon cells list four lines per card.
fn parse_pokemon_lines(body: &[&str], group: &mut CardGroup) -> ParseResult<()> {
    if body.len() % 4 != 0 {
        return Err(ParseError::RaggedPokemonBlock { lines: body.len() });
    }
    for chunk in body.chunks_exact(4) {
        let name = chunk[0];
        let code = format!("{} {}", chunk[1], chunk[2]);
        let copies = parse_copies(chunk[3])?;
        let code = print_override(name, &code);
        group.add(format!("{}\n{}", name, code), copies);
    }
    Ok(())
}

/// Flat cells list one `名前 n枚` line per card.
fn parse_flat_lines(body: &[&str], group: &mut CardGroup) -> ParseResult<()> {
    for line in body {
        let (name, copies) = split_card_line(line)?;
        group.add(name, copies);
    }
    Ok(())
}

fn split_card_line(line: &str) -> ParseResult<(String, u32)> {
    let (name, count) = line
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| ParseError::MalformedLine {
            line: line.to_string(),
        })?;
    Ok((strip_annotation(name), parse_copies(count)?))
}

fn parse_copies(token: &str) -> ParseResult<u32> {
    token
        .strip_suffix('枚')
        .unwrap_or(token)
        .parse()
        .map_err(|_| ParseError::MalformedLine {
            line: token.to_string(),
        })
}

/// Drop a trailing parenthesized annotation, full-width or ASCII.
fn strip_annotation(name: &str) -> String {
    match name.find(|c| c == '（' || c == '(') {
        Some(idx) => name[..idx].trim_end().to_string(),
        None => name.trim().to_string(),
    }
}

/// Promo sheets print no collector number and repeat the expansion
/// symbol in its place, leaving one (name, code) pair that denotes two
/// unrelated prints. A fixed lookup pins it to the intended print; this
/// is not a general disambiguation mechanism.
fn print_override<'a>(name: &str, code: &'a str) -> &'a str {
    match (name, code) {
        ("ピカチュウ", "S-P S-P") => "S-P 123/S-P",
        _ => code,
    }
}
