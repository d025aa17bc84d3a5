//! Brailler core.
//!
//! Sans-IO translation and accumulation engine for 6-dot braille cells.
//!
//! ## Architecture
//!
//! ```text
//! brailler-core
//!   ├─ BitPattern         (validated 6-dot cell)
//!   ├─ Mode               (UEB / NEMETH table selector)
//!   ├─ SymbolTable        (immutable pattern -> symbol map)
//!   ├─ Translator         (total cell -> symbol function)
//!   ├─ SessionStore       (per-user accumulated text)
//!   ├─ Transcriber        (translate + append, returns actions)
//!   └─ PersistenceGateway (durable mirror, implemented by drivers)
//! ```
//!
//! The core never performs I/O. [`Transcriber::submit`] returns
//! [`TranscriptAction`]s describing the durable write and any noteworthy
//! degradation; the driver decides how and when to execute them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod gateway;
mod mode;
mod pattern;
pub mod session;
mod table;
mod transcriber;
mod user;

pub use gateway::{GatewayError, PersistenceGateway};
pub use mode::{Mode, ModeError};
pub use pattern::{BitPattern, CELL_WIDTH, PatternError};
pub use session::{Appended, SessionBuffer, SessionStore};
pub use table::{FALLBACK_SYMBOL, Symbol, SymbolTable, TranslateError, Translator};
pub use transcriber::{
    CellInput, LogLevel, Submission, TranscribeError, Transcriber, TranscriptAction,
    TranslationPolicy,
};
pub use user::UserId;
