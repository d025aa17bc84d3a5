//! Reference model for model-based testing.
//!
//! The model is a deliberately naive implementation of cell translation and
//! per-user accumulation. It serves as the oracle against which the real
//! engine is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Behavior not implementation: Captures WHAT, not HOW
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod world;

pub use operation::{CellChoice, ModeChoice, ModelUserId, Operation, OperationResult};
pub use world::{ModelWorld, ObservableState};
