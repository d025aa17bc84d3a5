//! Transcriber
//!
//! Orchestrates translation and accumulation for submitted cells.
//!
//! ## Responsibilities
//!
//! - Input defaulting: missing user, cell and mode take their documented
//!   defaults
//! - Translation: resolve the mode and translate the cell under the
//!   configured [`TranslationPolicy`]
//! - Accumulation: append the symbol to the user's buffer
//! - Action generation: return a [`TranscriptAction::Mirror`] for the driver
//!   to hand to a [`PersistenceGateway`](crate::PersistenceGateway), plus log
//!   actions for degraded input (action-based, no direct I/O)

use std::{sync::Arc, time::Instant};

use crate::{
    env::Environment,
    mode::{Mode, ModeError},
    session::SessionStore,
    table::{FALLBACK_SYMBOL, Symbol, TranslateError, Translator},
    user::UserId,
};

/// Cell used when a submission carries none.
pub const DEFAULT_BITS: &str = "000000";

/// How malformed or unmapped input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationPolicy {
    /// Unknown modes become UEB and untranslatable cells become `"?"`.
    #[default]
    Permissive,

    /// Unknown modes and untranslatable cells are rejected and nothing is
    /// appended.
    Strict,
}

/// A submitted cell before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellInput {
    /// Submitting user; absent or empty means [`UserId::DEFAULT`].
    pub user_id: Option<String>,
    /// Cell bits; absent means [`DEFAULT_BITS`].
    pub bits: Option<String>,
    /// Mode name; absent means UEB.
    pub mode: Option<String>,
}

impl CellInput {
    /// Input with every field present.
    pub fn new(user_id: impl Into<String>, bits: impl Into<String>, mode: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), bits: Some(bits.into()), mode: Some(mode.into()) }
    }
}

/// Log severity for [`TranscriptAction::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Per-cell detail.
    Debug,
    /// Notable but expected.
    Info,
    /// Degraded input that was accepted anyway.
    Warn,
}

/// Actions returned by [`Transcriber::submit`] for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptAction {
    /// Overwrite the user's durable record with the full text.
    Mirror {
        /// Record key.
        user_id: UserId,
        /// Entire accumulated text after the append.
        text: String,
        /// Buffer revision the text corresponds to.
        revision: u64,
        /// When the append happened.
        processed_at: Instant,
    },

    /// Emit a log line.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message.
        message: String,
    },
}

/// Outcome of one accepted cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// User the cell was appended for.
    pub user_id: UserId,
    /// Mode the cell was translated under.
    pub mode: Mode,
    /// Symbol produced for the cell.
    pub translated: Symbol,
    /// Full text after the append.
    pub full_text: String,
    /// Buffer revision after the append.
    pub revision: u64,
    /// Actions for the driver.
    pub actions: Vec<TranscriptAction>,
}

impl Submission {
    /// The mirror action, if present.
    pub fn mirror(&self) -> Option<&TranscriptAction> {
        self.actions.iter().find(|action| matches!(action, TranscriptAction::Mirror { .. }))
    }
}

/// Errors from [`Transcriber::submit`] under [`TranslationPolicy::Strict`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscribeError {
    /// Mode name is not recognized.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// Cell is malformed or has no symbol.
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

/// Translates cells and accumulates them per user.
pub struct Transcriber<E>
where
    E: Environment,
{
    env: E,
    translator: Arc<Translator>,
    store: SessionStore,
    policy: TranslationPolicy,
}

impl<E> Transcriber<E>
where
    E: Environment,
{
    /// Permissive transcriber with freshly built tables.
    pub fn new(env: E) -> Self {
        Self::with_policy(env, Arc::new(Translator::new()), TranslationPolicy::default())
    }

    /// Transcriber sharing `translator` under `policy`.
    pub fn with_policy(env: E, translator: Arc<Translator>, policy: TranslationPolicy) -> Self {
        Self { env, translator, store: SessionStore::new(), policy }
    }

    /// Translate one cell and append it to the user's text.
    ///
    /// Under [`TranslationPolicy::Permissive`] this never fails.
    pub fn submit(&self, input: CellInput) -> Result<Submission, TranscribeError> {
        let user_id = UserId::resolve(input.user_id.as_deref());
        let bits = input.bits.as_deref().unwrap_or(DEFAULT_BITS);
        let mut actions = Vec::new();

        let mode = match (input.mode.as_deref(), self.policy) {
            (None, _) => Mode::default(),
            (Some(name), TranslationPolicy::Strict) => name.parse()?,
            (Some(name), TranslationPolicy::Permissive) => {
                name.parse::<Mode>().unwrap_or_else(|_| {
                    actions.push(TranscriptAction::Log {
                        level: LogLevel::Warn,
                        message: format!("unknown mode {name:?} for user {user_id}, using UEB"),
                    });
                    Mode::default()
                })
            },
        };

        let translated = match self.policy {
            TranslationPolicy::Strict => self.translator.translate_strict(bits, mode)?,
            TranslationPolicy::Permissive => {
                let symbol = self.translator.translate(bits, mode);
                if symbol == FALLBACK_SYMBOL {
                    actions.push(TranscriptAction::Log {
                        level: LogLevel::Warn,
                        message: format!("cell {bits:?} has no {mode} symbol for user {user_id}"),
                    });
                }
                symbol
            },
        };

        let now = self.env.now();
        let appended = self.store.append(&user_id, translated);

        if appended.revision == 1 {
            actions.push(TranscriptAction::Log {
                level: LogLevel::Info,
                message: format!("first cell for user {user_id} in this process"),
            });
        }
        actions.push(TranscriptAction::Log {
            level: LogLevel::Debug,
            message: format!(
                "user {user_id} cell {bits} ({mode}) -> {translated:?}, revision {}",
                appended.revision
            ),
        });
        actions.push(TranscriptAction::Mirror {
            user_id: user_id.clone(),
            text: appended.text.clone(),
            revision: appended.revision,
            processed_at: now,
        });

        Ok(Submission {
            user_id,
            mode,
            translated,
            full_text: appended.text,
            revision: appended.revision,
            actions,
        })
    }

    /// Current in-memory text for `user`.
    pub fn snapshot(&self, user: &str) -> String {
        self.store.snapshot(user)
    }

    /// Restore `user`'s text from the durable mirror if no buffer exists yet.
    pub fn recover(&self, user: &UserId, text: String) -> bool {
        self.store.seed(user, text)
    }

    /// Put a late-recovered record in front of `user`'s text.
    pub fn rebase(&self, user: &UserId, prefix: &str) -> String {
        self.store.rebase(user, prefix).text
    }

    /// Underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Shared translator.
    pub fn translator(&self) -> &Arc<Translator> {
        &self.translator
    }

    /// Active translation policy.
    pub fn policy(&self) -> TranslationPolicy {
        self.policy
    }

    /// Environment used for timestamps.
    pub fn env(&self) -> &E {
        &self.env
    }
}

impl<E> std::fmt::Debug for Transcriber<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcriber")
            .field("user_count", &self.store.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
