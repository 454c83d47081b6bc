//! Turns text recovered from the BYMA ratio document into a `symbol -> ratio` table.
//!
//! Two passes run over whitespace-normalised text. The direct pass looks for a
//! short uppercase word followed closely by a `N:1` ratio. The fallback pass walks
//! a token stream and binds each ratio to the last symbol-shaped token seen. In
//! both passes the first binding of a symbol wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Tables with fewer distinct symbols than this are flagged as low quality.
pub const DEFAULT_QUALITY_THRESHOLD: usize = 100;

/// Words that look like symbols in the document but never are.
const EXCLUDED_WORDS: &[&str] = &[
    "CEDEAR", "CEDEARS", "BYMA", "BOLSAS", "MERCADOS", "ARGENTINOS", "RATIO", "VALOR",
    "SUBYACENTE", "ISIN", "CUSIP", "NASDAQ", "NYSE", "LSE", "AMEX", "USD", "ARS", "ETF",
    "SEDE", "ACCION", "EMPRESA", "SECTOR", "INDEX", "TABLE", "PAGE", "VOL", "ADR",
    "PROGRAMAS", "ENERO", "FEBRERO", "MARZO", "ABRIL", "MAYO", "JUNIO", "JULIO", "AGOSTO",
    "SEPTIEMBRE", "OCTUBRE", "NOVIEMBRE", "DICIEMBRE",
];

static EXCLUDED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| EXCLUDED_WORDS.iter().copied().collect());

static SYMBOL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,6}(?:\.[A-Z]{1,2})?$").expect("symbol regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space regex"));

// Symbol-ish word, up to 60 colon-free chars, then a standalone `N:1`.
static DIRECT_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z0-9.]{1,6})\b[^:]{0,60}?\b(\d{1,3}):1\b").expect("direct pair regex")
});

// Ratio tokens are tried first so that their digits are not swallowed as a symbol run.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<ratio>\d{1,3}):1\b|(?P<word>[A-Z0-9.]{1,10})").expect("token regex")
});

/// A mapping from canonical symbol to its positive conversion ratio.
///
/// Entries are write-once: inserting a symbol that is already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioTable {
    entries: BTreeMap<String, u32>,
}

impl RatioTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `symbol -> ratio` unless the symbol is already bound or the ratio is zero.
    /// Returns whether the entry was inserted.
    pub fn insert_first(&mut self, symbol: &str, ratio: u32) -> bool {
        if ratio == 0 || self.entries.contains_key(symbol) {
            return false;
        }
        self.entries.insert(symbol.to_string(), ratio);
        true
    }

    pub fn get(&self, symbol: &str) -> Option<u32> {
        self.entries.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(symbol, ratio)| (symbol.as_str(), *ratio))
    }

    /// Whether the table is too small to trust as a complete read of the document.
    pub fn is_low_quality(&self, threshold: usize) -> bool {
        self.len() < threshold
    }
}

impl FromIterator<(String, u32)> for RatioTable {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut table = RatioTable::new();
        for (symbol, ratio) in iter {
            table.insert_first(&symbol, ratio);
        }
        table
    }
}

/// When the token-walking fallback pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPass {
    Always,
    /// Only when the direct pass found fewer distinct symbols than the threshold.
    BelowThreshold(usize),
}

impl Default for FallbackPass {
    fn default() -> Self {
        FallbackPass::BelowThreshold(DEFAULT_QUALITY_THRESHOLD)
    }
}

/// Collapses line breaks and whitespace runs into single spaces.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// Whether `token` has the shape of a symbol and is not an excluded word.
pub fn is_symbol(token: &str) -> bool {
    SYMBOL_SHAPE.is_match(token) && !EXCLUDED.contains(token)
}

fn clean_candidate(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_uppercase() || *c == '.')
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RatioParser {
    fallback: FallbackPass,
}

impl RatioParser {
    pub fn new(fallback: FallbackPass) -> Self {
        Self { fallback }
    }

    pub fn parse(&self, text: &str) -> RatioTable {
        let text = normalize_text(text);
        let mut table = RatioTable::new();

        direct_pass(&text, &mut table);
        let direct_count = table.len();

        let run_fallback = match self.fallback {
            FallbackPass::Always => true,
            FallbackPass::BelowThreshold(threshold) => direct_count < threshold,
        };
        if run_fallback {
            fallback_pass(&text, &mut table);
        }

        debug!(
            direct = direct_count,
            fallback = table.len() - direct_count,
            "Parsed ratio table"
        );
        table
    }
}

fn direct_pass(text: &str, table: &mut RatioTable) {
    for caps in DIRECT_PAIR.captures_iter(text) {
        let candidate = clean_candidate(&caps[1]);
        if !is_symbol(&candidate) {
            continue;
        }
        if let Ok(ratio) = caps[2].parse::<u32>() {
            table.insert_first(&candidate, ratio);
        }
    }
}

fn fallback_pass(text: &str, table: &mut RatioTable) {
    let mut pending: Option<String> = None;

    for caps in TOKEN.captures_iter(text) {
        if let Some(ratio) = caps.name("ratio") {
            let Ok(ratio) = ratio.as_str().parse::<u32>() else {
                continue;
            };
            // A ratio without an unbound candidate is dropped; the candidate stays pending.
            if let Some(symbol) = pending.as_deref() {
                if !table.contains(symbol) && table.insert_first(symbol, ratio) {
                    pending = None;
                }
            }
        } else if let Some(word) = caps.name("word") {
            let candidate = clean_candidate(word.as_str());
            if is_symbol(&candidate) {
                pending = Some(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RatioTable {
        RatioParser::default().parse(text)
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("AAPL\n\n  20:1\t\r\nMSFT"), "AAPL 20:1 MSFT");
    }

    #[test]
    fn test_direct_pairs() {
        let table = parse("AAPL 20:1\nMSFT 30:1\nBRK.B 22:1");

        assert_eq!(table.get("AAPL"), Some(20));
        assert_eq!(table.get("MSFT"), Some(30));
        assert_eq!(table.get("BRK.B"), Some(22));
    }

    #[test]
    fn test_text_without_pairs_is_empty() {
        assert!(parse("").is_empty());
        assert!(parse("no ratios here at all, only lowercase 20:1").is_empty());
        assert!(parse("ABC DEF GHI").is_empty());
        assert!(parse(": : 20:").is_empty());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let table = parse("AAPL 20:1 then later on the page AAPL 30:1");
        assert_eq!(table.get("AAPL"), Some(20));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_excluded_words_are_not_symbols() {
        let table = parse("USD 10:1 NASDAQ 5:1 ENERO 3:1");
        assert!(!table.contains("USD"));
        assert!(!table.contains("NASDAQ"));
        assert!(!table.contains("ENERO"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_ratios_are_rejected() {
        let table = parse("ZERO 0:1 WIDE 1234:1 ODD 10:15");
        assert!(table.is_empty(), "unexpected entries: {table:?}");
    }

    #[test]
    fn test_ratios_are_positive() {
        let table = parse("KO 5:1 PEP 18:1 F 1:1 XOM 999:1");
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|(_, ratio)| ratio > 0));
        assert_eq!(table.get("XOM"), Some(999));
        assert_eq!(table.get("F"), Some(1));
    }

    #[test]
    fn test_candidate_digits_are_stripped() {
        // `MELI1` is cleaned to `MELI` before the shape check.
        let table = parse("MELI1 120:1");
        assert_eq!(table.get("MELI"), Some(120));
    }

    #[test]
    fn test_lookahead_window_is_bounded() {
        let filler = "x".repeat(61);
        let table = RatioParser::new(FallbackPass::BelowThreshold(0)).parse(&format!("AAPL {filler} 20:1"));
        assert!(table.is_empty());

        let filler = "x".repeat(40);
        let table = RatioParser::new(FallbackPass::BelowThreshold(0)).parse(&format!("AAPL {filler} 20:1"));
        assert_eq!(table.get("AAPL"), Some(20));
    }

    #[test]
    fn test_colon_blocks_direct_pass() {
        let table =
            RatioParser::new(FallbackPass::BelowThreshold(0)).parse("AAPL ratio: 20:1");
        assert!(table.is_empty());
    }

    #[test]
    fn test_adjacent_symbols_share_window() {
        // The window is not symbol-aware: the first word takes the ratio.
        let table = RatioParser::new(FallbackPass::BelowThreshold(0)).parse("AAPL MSFT 20:1");
        assert_eq!(table.get("AAPL"), Some(20));
        assert!(!table.contains("MSFT"));
    }

    #[test]
    fn test_fallback_binds_last_candidate() {
        // The colon keeps the direct pass from pairing these.
        let table = parse("AAPL ratio: 20:1 MSFT ratio: 30:1");
        assert_eq!(table.get("AAPL"), Some(20));
        assert_eq!(table.get("MSFT"), Some(30));
    }

    #[test]
    fn test_fallback_discards_orphan_ratio() {
        let mut table = RatioTable::new();
        fallback_pass("20:1 AAPL: 30:1 40:1", &mut table);
        assert_eq!(table.get("AAPL"), Some(30));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_fallback_keeps_bound_symbols() {
        let mut table = RatioTable::new();
        table.insert_first("AAPL", 20);
        fallback_pass("AAPL: 30:1", &mut table);
        assert_eq!(table.get("AAPL"), Some(20));
    }

    #[test]
    fn test_fallback_skipped_above_threshold() {
        let parser = RatioParser::new(FallbackPass::BelowThreshold(1));
        let table = parser.parse("AAPL 20:1 MSFT: 30:1");
        assert_eq!(table.get("AAPL"), Some(20));
        assert!(!table.contains("MSFT"));

        let table = RatioParser::new(FallbackPass::Always).parse("AAPL 20:1 MSFT: 30:1");
        assert_eq!(table.get("MSFT"), Some(30));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "KO 5:1 PEP: 18:1 AAPL\n20:1 BRK.B 22:1";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_low_quality_flag() {
        let table = parse("KO 5:1");
        assert!(table.is_low_quality(DEFAULT_QUALITY_THRESHOLD));
        assert!(!table.is_low_quality(1));
    }

    #[test]
    fn test_is_symbol() {
        assert!(is_symbol("AAPL"));
        assert!(is_symbol("BRK.B"));
        assert!(!is_symbol("TOOLONGX"));
        assert!(!is_symbol("AAPL.XYZ"));
        assert!(!is_symbol(""));
        assert!(!is_symbol("CEDEAR"));
    }
}
