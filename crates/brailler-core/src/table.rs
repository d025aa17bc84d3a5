//! Symbol tables and the cell translator.
//!
//! Each [`Mode`] owns exactly one immutable [`SymbolTable`]. Tables are built
//! once when the [`Translator`] is constructed and shared read-only afterwards.

use std::collections::HashMap;

use crate::{
    mode::Mode,
    pattern::{BitPattern, PatternError},
};

/// A translated output symbol.
pub type Symbol = &'static str;

/// Symbol produced for any pattern a table does not contain.
pub const FALLBACK_SYMBOL: Symbol = "?";

/// Letters a-j share their dot patterns with Nemeth digits 1-0.
const UEB_ENTRIES: [(&str, Symbol); 11] = [
    ("100000", "a"),
    ("110000", "b"),
    ("100100", "c"),
    ("100110", "d"),
    ("100010", "e"),
    ("110100", "f"),
    ("110110", "g"),
    ("110010", "h"),
    ("010100", "i"),
    ("010110", "j"),
    ("000000", " "),
];

const NEMETH_ENTRIES: [(&str, Symbol); 10] = [
    ("100000", "1"),
    ("110000", "2"),
    ("100100", "3"),
    ("100110", "4"),
    ("100010", "5"),
    ("110100", "6"),
    ("110110", "7"),
    ("110010", "8"),
    ("010100", "9"),
    ("010110", "0"),
];

/// Errors from strict translation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    /// The input is not a well-formed cell.
    #[error("malformed cell: {0}")]
    Pattern(#[from] PatternError),

    /// The cell is well-formed but has no symbol in the selected table.
    #[error("no {mode} symbol for cell {pattern}")]
    Unmapped {
        /// Cell that was looked up.
        pattern: BitPattern,
        /// Table it was looked up in.
        mode: Mode,
    },
}

/// Immutable mapping from cells to symbols for one mode.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    mode: Mode,
    entries: HashMap<BitPattern, Symbol>,
}

impl SymbolTable {
    fn build(mode: Mode, raw: &[(&str, Symbol)]) -> Self {
        let entries = raw
            .iter()
            .filter_map(|(bits, symbol)| BitPattern::parse(bits).ok().map(|cell| (cell, *symbol)))
            .collect();
        Self { mode, entries }
    }

    /// Mode this table belongs to.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Symbol for `pattern`, if the table has one.
    pub fn lookup(&self, pattern: &BitPattern) -> Option<Symbol> {
        self.entries.get(pattern).copied()
    }

    /// Number of mapped cells.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table maps no cells.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(cell, symbol)` entries in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (BitPattern, Symbol)> + '_ {
        let mut entries: Vec<_> = self.entries.iter().map(|(cell, sym)| (*cell, *sym)).collect();
        entries.sort_unstable();
        entries.into_iter()
    }
}

/// Converts cells to symbols under a selected mode.
///
/// [`Translator::translate`] is total: malformed or unmapped input yields
/// [`FALLBACK_SYMBOL`] instead of an error. [`Translator::translate_strict`]
/// is the validating counterpart.
#[derive(Debug, Clone)]
pub struct Translator {
    ueb: SymbolTable,
    nemeth: SymbolTable,
}

impl Translator {
    /// Build all symbol tables.
    pub fn new() -> Self {
        Self {
            ueb: SymbolTable::build(Mode::Ueb, &UEB_ENTRIES),
            nemeth: SymbolTable::build(Mode::Nemeth, &NEMETH_ENTRIES),
        }
    }

    /// Table for `mode`.
    pub fn table(&self, mode: Mode) -> &SymbolTable {
        match mode {
            Mode::Ueb => &self.ueb,
            Mode::Nemeth => &self.nemeth,
        }
    }

    /// Translate raw cell input, degrading to [`FALLBACK_SYMBOL`].
    pub fn translate(&self, bits: &str, mode: Mode) -> Symbol {
        BitPattern::parse(bits)
            .map_or(FALLBACK_SYMBOL, |cell| self.translate_pattern(&cell, mode))
    }

    /// Translate a validated cell, degrading to [`FALLBACK_SYMBOL`].
    pub fn translate_pattern(&self, pattern: &BitPattern, mode: Mode) -> Symbol {
        self.table(mode).lookup(pattern).unwrap_or(FALLBACK_SYMBOL)
    }

    /// Translate raw cell input, rejecting malformed and unmapped cells.
    pub fn translate_strict(&self, bits: &str, mode: Mode) -> Result<Symbol, TranslateError> {
        let pattern = BitPattern::parse(bits)?;
        self.table(mode).lookup(&pattern).ok_or(TranslateError::Unmapped { pattern, mode })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ueb_letters_and_space() {
        let t = Translator::new();
        assert_eq!(t.translate("100000", Mode::Ueb), "a");
        assert_eq!(t.translate("110000", Mode::Ueb), "b");
        assert_eq!(t.translate("010110", Mode::Ueb), "j");
        assert_eq!(t.translate("000000", Mode::Ueb), " ");
    }

    #[test]
    fn nemeth_digits() {
        let t = Translator::new();
        assert_eq!(t.translate("100000", Mode::Nemeth), "1");
        assert_eq!(t.translate("010100", Mode::Nemeth), "9");
        assert_eq!(t.translate("010110", Mode::Nemeth), "0");
    }

    #[test]
    fn nemeth_has_no_blank_cell() {
        let t = Translator::new();
        assert_eq!(t.translate("000000", Mode::Nemeth), FALLBACK_SYMBOL);
        assert!(t.translate_strict("000000", Mode::Nemeth).is_err());
    }

    #[test]
    fn unknown_and_malformed_fall_back() {
        let t = Translator::new();
        assert_eq!(t.translate("111111", Mode::Ueb), "?");
        assert_eq!(t.translate("999999", Mode::Ueb), "?");
        assert_eq!(t.translate("1", Mode::Ueb), "?");
        assert_eq!(t.translate("", Mode::Nemeth), "?");
    }

    #[test]
    fn strict_distinguishes_malformed_from_unmapped() {
        let t = Translator::new();
        assert!(matches!(
            t.translate_strict("10", Mode::Ueb),
            Err(TranslateError::Pattern(PatternError::Length { actual: 2 }))
        ));
        assert!(matches!(
            t.translate_strict("111111", Mode::Ueb),
            Err(TranslateError::Unmapped { mode: Mode::Ueb, .. })
        ));
        assert_eq!(t.translate_strict("100100", Mode::Ueb), Ok("c"));
    }

    #[test]
    fn tables_have_documented_sizes() {
        let t = Translator::new();
        assert_eq!(t.table(Mode::Ueb).len(), 11);
        assert_eq!(t.table(Mode::Nemeth).len(), 10);
        assert_eq!(t.table(Mode::Nemeth).mode(), Mode::Nemeth);
    }

    #[test]
    fn iter_is_sorted_by_cell() {
        let t = Translator::new();
        let cells: Vec<_> = t.table(Mode::Ueb).iter().map(|(cell, _)| cell).collect();
        let mut sorted = cells.clone();
        sorted.sort_unstable();
        assert_eq!(cells, sorted);
        assert_eq!(cells.first(), Some(&BitPattern::BLANK));
    }
}
