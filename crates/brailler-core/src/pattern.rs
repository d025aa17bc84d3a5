//! Validated 6-dot braille cell.

use std::fmt;

/// Number of dots in a single cell.
pub const CELL_WIDTH: usize = 6;

/// Errors from strict pattern parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Input is not exactly [`CELL_WIDTH`] characters.
    #[error("cell must be {CELL_WIDTH} dots, got {actual}")]
    Length {
        /// Character count of the rejected input.
        actual: usize,
    },

    /// A character other than `0` or `1` was found.
    #[error("invalid dot {found:?} at position {position}")]
    InvalidDot {
        /// Zero-based character position.
        position: usize,
        /// Offending character.
        found: char,
    },
}

/// A 6-character string over `{0, 1}`.
///
/// Character `i` (zero-based) is raised dot `i + 1`, so `"100000"` is dot 1
/// alone. Construction through [`BitPattern::parse`] is the only way to obtain
/// one, which makes the width invariant hold for every value of this type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitPattern([u8; CELL_WIDTH]);

impl BitPattern {
    /// The empty cell (no raised dots).
    pub const BLANK: Self = Self([b'0'; CELL_WIDTH]);

    /// Parse a pattern, rejecting anything that is not 6 binary digits.
    pub fn parse(bits: &str) -> Result<Self, PatternError> {
        let actual = bits.chars().count();
        if actual != CELL_WIDTH {
            return Err(PatternError::Length { actual });
        }

        let mut cell = [b'0'; CELL_WIDTH];
        for (position, found) in bits.chars().enumerate() {
            cell[position] = match found {
                '0' => b'0',
                '1' => b'1',
                _ => return Err(PatternError::InvalidDot { position, found }),
            };
        }

        Ok(Self(cell))
    }

    /// Build a pattern from raised-dot flags, dot 1 first.
    pub fn from_dots(dots: [bool; CELL_WIDTH]) -> Self {
        Self(dots.map(|raised| if raised { b'1' } else { b'0' }))
    }

    /// Raised-dot flags, dot 1 first.
    pub fn dots(&self) -> [bool; CELL_WIDTH] {
        self.0.map(|b| b == b'1')
    }

    /// The pattern as its 6-character string form.
    pub fn as_str(&self) -> &str {
        // Only ASCII '0'/'1' are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("000000")
    }
}

impl Default for BitPattern {
    fn default() -> Self {
        Self::BLANK
    }
}

impl fmt::Display for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitPattern({})", self.as_str())
    }
}

impl std::str::FromStr for BitPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
