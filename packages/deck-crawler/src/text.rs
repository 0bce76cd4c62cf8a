//! Text helpers for the full-width forms the official site renders.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTEGER_RE: Regex = Regex::new(r"\d+").unwrap();
}

/// Fold full-width ASCII forms (`１２３ＡＢＣ`) and the ideographic space
/// into their half-width equivalents. Everything else passes through.
///
/// Covers the full-width block addresses and collector numbers actually
/// use; this is not a general NFKC normalization.
pub fn full_to_half(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// The integer in text containing exactly one run of digits.
///
/// Returns `None` for zero or several runs, so ambiguous strings like a
/// capacity rendered with a date are not misread.
pub fn sole_integer(text: &str) -> Option<u32> {
    let mut matches = INTEGER_RE.find_iter(text);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    first.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_to_half_folds_ascii_block() {
        assert_eq!(full_to_half("１２３ＡＢＣ　ｘ"), "123ABC x");
    }

    #[test]
    fn test_full_to_half_keeps_other_text() {
        assert_eq!(full_to_half("埼玉県さいたま市"), "埼玉県さいたま市");
    }

    #[test]
    fn test_sole_integer_single_run() {
        assert_eq!(sole_integer("定員：64人"), Some(64));
        assert_eq!(sole_integer("64"), Some(64));
    }

    #[test]
    fn test_sole_integer_rejects_ambiguity() {
        assert_eq!(sole_integer("64人 (32チーム)"), None);
        assert_eq!(sole_integer("未定"), None);
    }
}
