//! Symbol table selector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors from strict mode parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    /// Mode name matches no known table.
    #[error("unknown mode: {0:?}")]
    Unknown(String),
}

/// Which symbol table a cell is translated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Unified English Braille letters.
    #[default]
    Ueb,
    /// Nemeth code digits.
    Nemeth,
}

impl Mode {
    /// All supported modes.
    pub const ALL: [Self; 2] = [Self::Ueb, Self::Nemeth];

    /// Canonical upper-case name.
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Ueb => "UEB",
            Self::Nemeth => "NEMETH",
        }
    }

    /// Resolve a caller-supplied mode name, falling back to [`Mode::Ueb`].
    ///
    /// Matching is ASCII case-insensitive on the exact characters given;
    /// surrounding whitespace is not stripped.
    pub fn resolve(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.canonical().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModeError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_insensitive() {
        for name in ["nemeth", "NEMETH", "Nemeth", "nEmEtH"] {
            assert_eq!(Mode::resolve(name), Mode::Nemeth);
        }
        for name in ["ueb", "UEB", "Ueb"] {
            assert_eq!(Mode::resolve(name), Mode::Ueb);
        }
    }

    #[test]
    fn resolve_falls_back_to_ueb() {
        assert_eq!(Mode::resolve("braille2"), Mode::Ueb);
        assert_eq!(Mode::resolve(""), Mode::Ueb);
        assert_eq!(Mode::resolve(" nemeth"), Mode::Ueb);
    }

    #[test]
    fn strict_parse_rejects_unknown() {
        assert_eq!("grade2".parse::<Mode>(), Err(ModeError::Unknown("grade2".to_string())));
        assert_eq!("Nemeth".parse::<Mode>(), Ok(Mode::Nemeth));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(Mode::Nemeth.to_string(), "NEMETH");
        assert_eq!(Mode::default().to_string(), "UEB");
    }
}
