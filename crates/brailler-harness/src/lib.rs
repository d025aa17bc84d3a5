//! Deterministic testing harness for the brailler engine.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real
//! implementation, and their observable states are compared.
//!
//! [`ManualEnv`] is an `Environment` whose clock only moves when told to and
//! whose randomness is seeded, so runs are reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod manual_env;
pub mod model;

pub use manual_env::ManualEnv;
pub use model::{
    CellChoice, ModeChoice, ModelUserId, ModelWorld, ObservableState, Operation, OperationResult,
};
