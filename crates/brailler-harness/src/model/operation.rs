//! Operations for model-based testing.
//!
//! Operations represent every externally visible action on the engine. They
//! are generated randomly and applied to both the model and the real
//! implementation.

use arbitrary::Arbitrary;

/// User identifier (uses u8 to keep the user space small).
pub type ModelUserId = u8;

/// Number of distinct users operations address.
pub const USER_COUNT: u8 = 4;

/// Cell input, biased towards interesting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum CellChoice {
    /// No `bits` field (defaults to the blank cell).
    Missing,
    /// A well-formed cell; the low 6 bits are dots 1-6.
    Dots(u8),
    /// A malformed string.
    Malformed(u8),
}

impl CellChoice {
    /// The `bits` field this choice submits.
    pub fn to_bits(self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Dots(mask) => Some(
                (0..6).map(|dot| if mask & (0b10_0000 >> dot) != 0 { '1' } else { '0' }).collect(),
            ),
            Self::Malformed(kind) => Some(
                match kind % 5 {
                    0 => "",
                    1 => "10000",
                    2 => "1000000",
                    3 => "999999",
                    _ => "10a000",
                }
                .to_string(),
            ),
        }
    }
}

/// Mode input, including casing variants and unknown names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModeChoice {
    /// No `mode` field.
    Missing,
    /// Some spelling of UEB.
    Ueb(u8),
    /// Some spelling of NEMETH.
    Nemeth(u8),
    /// A name matching no table.
    Unknown,
}

impl ModeChoice {
    /// The `mode` field this choice submits.
    pub fn to_name(self) -> Option<String> {
        let spell = |name: &str, casing: u8| match casing % 3 {
            0 => name.to_uppercase(),
            1 => name.to_lowercase(),
            _ => {
                let mut chars = name.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                })
            },
        };

        match self {
            Self::Missing => None,
            Self::Ueb(casing) => Some(spell("ueb", casing)),
            Self::Nemeth(casing) => Some(spell("nemeth", casing)),
            Self::Unknown => Some("grade2".to_string()),
        }
    }
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Submit one cell for a user.
    Submit {
        /// Submitting user (mapped to `"u{n}"`, `None` means absent).
        user: Option<ModelUserId>,
        /// Cell to submit.
        cell: CellChoice,
        /// Mode to submit under.
        mode: ModeChoice,
    },

    /// Read a user's in-memory text.
    ReadBuffer {
        /// User to read.
        user: ModelUserId,
    },

    /// Wait until the durable mirror has caught up.
    ///
    /// In the real system, this flushes the mirror writer.
    /// In the model, this copies buffers to the mirror.
    SyncMirror,
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// A cell was accepted.
    Submitted {
        /// Symbol produced.
        translated: String,
        /// Full text afterwards.
        full_text: String,
    },

    /// Text read back.
    Text(String),

    /// Operation has no observable result.
    Ok,
}

/// Real user id for a model user.
pub fn user_key(user: Option<ModelUserId>) -> Option<String> {
    user.map(|u| format!("u{}", u % USER_COUNT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_map_high_bit_to_dot_one() {
        assert_eq!(CellChoice::Dots(0b10_0000).to_bits().as_deref(), Some("100000"));
        assert_eq!(CellChoice::Dots(0b01_0110).to_bits().as_deref(), Some("010110"));
        assert_eq!(CellChoice::Dots(0).to_bits().as_deref(), Some("000000"));
    }

    #[test]
    fn malformed_cells_are_never_six_binary_digits() {
        for kind in 0..5 {
            let bits = CellChoice::Malformed(kind).to_bits().unwrap();
            let well_formed = bits.len() == 6 && bits.chars().all(|c| c == '0' || c == '1');
            assert!(!well_formed, "{bits:?}");
        }
    }

    #[test]
    fn mode_spellings() {
        assert_eq!(ModeChoice::Ueb(0).to_name().as_deref(), Some("UEB"));
        assert_eq!(ModeChoice::Nemeth(1).to_name().as_deref(), Some("nemeth"));
        assert_eq!(ModeChoice::Nemeth(2).to_name().as_deref(), Some("Nemeth"));
        assert_eq!(ModeChoice::Missing.to_name(), None);
    }

    #[test]
    fn user_keys_wrap() {
        assert_eq!(user_key(Some(5)).as_deref(), Some("u1"));
        assert_eq!(user_key(None), None);
    }
}
