//! Number and key-term extraction from financial prose.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Signed, optionally dollar-prefixed number with thousands separators.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\$?\d[\d,]*(?:\.\d+)?").expect("valid number regex"));

/// Unit suffixes that may follow a number, longest first.
const UNITS: &[&str] = &[
    "billion", "million", "bps", "bp", "bn", "Bn", "BN", "mm", "MM", "mn", "Mn", "MN", "%", "B",
    "M", "K", "b", "m", "k",
];

/// Financial terms that signal analytical structure.
pub const STRUCTURE_TERMS: &[&str] = &[
    "beta",
    "duration",
    "hedge",
    "p&l",
    "pnl",
    "sleeve",
    "correlation",
    "drawdown",
    "factor",
    "alpha",
    "exposure",
    "volatility",
    "sharpe",
    "risk",
    "return",
    "portfolio",
    "position",
    "sizing",
    "notional",
    "delta",
    "gamma",
    "var",
    "cvar",
    "stress",
    "scenario",
    "decompos",
    "attribution",
    "kelly",
    "information ratio",
    "mnpi",
    "material non-public",
    "information barrier",
    "compliance",
    "regulatory",
];

/// Length of the unit suffix starting at `rest`, if one is present and not
/// itself glued to a following letter.
fn unit_len(rest: &str) -> Option<usize> {
    let trimmed = rest.trim_start();
    let skipped = rest.len() - trimmed.len();
    UNITS.iter().find_map(|unit| {
        let after = trimmed.strip_prefix(unit)?;
        match after.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => None,
            _ => Some(skipped + unit.len()),
        }
    })
}

/// Extract numeric values from financial text.
///
/// Handles dollar amounts (`-$21M` -> -21), percentages (`3%` -> 3), basis
/// points (`50bps` -> 50) and plain numbers. Numbers glued to letters such
/// as `PM-001` or `Q3` are skipped, except dollar amounts, which keep their
/// value whatever suffix follows (`$5mm`, `$2.1bn`). Values are deduplicated
/// and returned in order of first appearance.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let mut numbers: Vec<f64> = Vec::new();

    for m in NUMBER_RE.find_iter(text) {
        let preceded_by_letter = text[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if preceded_by_letter {
            continue;
        }

        let rest = &text[m.end()..];
        let is_dollar = m.as_str().contains('$');
        let followed_by_letter = rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if followed_by_letter && !is_dollar && unit_len(rest).is_none() {
            continue;
        }

        let cleaned: String = m.as_str().chars().filter(|c| *c != '$' && *c != ',').collect();
        let Ok(value) = cleaned.parse::<f64>() else {
            continue;
        };

        if !numbers.contains(&value) {
            numbers.push(value);
        }
    }

    numbers
}

/// Financial key terms present in the text (case-insensitive).
pub fn extract_key_terms(text: &str) -> BTreeSet<&'static str> {
    let lower = text.to_lowercase();
    STRUCTURE_TERMS
        .iter()
        .copied()
        .filter(|term| lower.contains(term))
        .collect()
}
