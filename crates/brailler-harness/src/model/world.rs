//! Model world - the reference engine.
//!
//! Tracks per-user text and the durable mirror with plain maps and a
//! hand-written translation function.

use std::collections::BTreeMap;

use super::operation::{CellChoice, ModeChoice, ModelUserId, Operation, OperationResult, user_key};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservableState {
    /// Per-user accumulated text, by user key.
    pub buffers: BTreeMap<String, String>,
    /// Per-user mirrored text as of the last sync, by user key.
    pub mirror: BTreeMap<String, String>,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    state: ObservableState,
}

impl ModelWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Submit { user, cell, mode } => self.apply_submit(*user, *cell, *mode),
            Operation::ReadBuffer { user } => {
                let key = user_key(Some(*user)).unwrap_or_default();
                OperationResult::Text(self.state.buffers.get(&key).cloned().unwrap_or_default())
            },
            Operation::SyncMirror => {
                self.state.mirror = self.state.buffers.clone();
                OperationResult::Ok
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        self.state.clone()
    }

    fn apply_submit(
        &mut self,
        user: Option<ModelUserId>,
        cell: CellChoice,
        mode: ModeChoice,
    ) -> OperationResult {
        let key = user_key(user).unwrap_or_else(|| "default".to_string());
        let bits = cell.to_bits().unwrap_or_else(|| "000000".to_string());
        let nemeth = matches!(mode, ModeChoice::Nemeth(_));

        let translated = model_translate(&bits, nemeth).to_string();
        let text = self.state.buffers.entry(key).or_default();
        text.push_str(&translated);

        OperationResult::Submitted { translated, full_text: text.clone() }
    }
}

/// Obviously-correct translation: a linear scan of the two tables.
fn model_translate(bits: &str, nemeth: bool) -> &'static str {
    const CELLS: [&str; 10] =
        ["100000", "110000", "100100", "100110", "100010", "110100", "110110", "110010", "010100", "010110"];
    const LETTERS: [&str; 10] = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    const DIGITS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"];

    if !nemeth && bits == "000000" {
        return " ";
    }
    let symbols = if nemeth { DIGITS } else { LETTERS };
    CELLS.iter().position(|cell| *cell == bits).map_or("?", |i| symbols[i])
}
