//! Request-level orchestration.
//!
//! [`TranscriptionService`] binds a [`Transcriber`] to an [`ActionExecutor`]
//! so transports only deal with two calls: submit a cell, read the mirror.
//! It also performs optional first-use recovery from the durable mirror.
//!
//! ## Recovery
//!
//! When recovery is enabled and the store cannot be read, the user's mirror
//! writes are held back: writing the fresh buffer would overwrite the stored
//! record it was meant to be recovered from. Each later submission retries
//! the read. Once it succeeds the stored text is put in front of the buffer
//! and mirroring resumes with the merged text.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use brailler_core::{
    CellInput, GatewayError, Submission, TranscribeError, Transcriber, TranscriptAction, UserId,
    env::Environment,
};

use crate::executor::ActionExecutor;

/// Submit and read operations shared by every transport.
pub struct TranscriptionService<E>
where
    E: Environment,
{
    transcriber: Transcriber<E>,
    executor: ActionExecutor<E>,
    recover_on_first_use: bool,
    /// Users whose recovery read failed and whose writes are held back.
    unrecovered: Mutex<HashSet<UserId>>,
}

impl<E> TranscriptionService<E>
where
    E: Environment,
{
    /// Service over `transcriber`, executing actions with `executor`.
    pub fn new(
        transcriber: Transcriber<E>,
        executor: ActionExecutor<E>,
        recover_on_first_use: bool,
    ) -> Self {
        Self { transcriber, executor, recover_on_first_use, unrecovered: Mutex::default() }
    }

    /// Translate and append one cell, then hand the new text to the mirror.
    ///
    /// The returned submission's actions have already been executed and are
    /// left empty. Mirror failures never surface here.
    pub async fn submit(&self, input: CellInput) -> Result<Submission, TranscribeError> {
        let request_id = self.transcriber.env().random_u64();
        let user = UserId::resolve(input.user_id.as_deref());

        let hold_back = self.recover_on_first_use && !self.recover(&user, request_id).await;

        let mut submission = self.transcriber.submit(input).inspect_err(|err| {
            tracing::warn!(request_id, "cell rejected: {}", err);
        })?;

        let mut actions = std::mem::take(&mut submission.actions);
        if hold_back {
            actions.retain(|action| !matches!(action, TranscriptAction::Mirror { .. }));
            tracing::warn!(
                request_id,
                %user,
                revision = submission.revision,
                "mirror write held back until the stored record can be recovered"
            );
        }
        self.executor.execute(actions, request_id).await;

        Ok(submission)
    }

    /// Read `user`'s record from the durable mirror.
    ///
    /// `Ok(None)` means the store has no record; `Err` means the store could
    /// not be read. The two are logged differently.
    pub async fn read_mirror(&self, user: &UserId) -> Result<Option<String>, GatewayError> {
        let timeout = self.executor.config().timeout;
        let result = tokio::time::timeout(timeout, self.executor.gateway().get(user))
            .await
            .unwrap_or(Err(GatewayError::Timeout(timeout)));

        match &result {
            Ok(Some(text)) => tracing::debug!(%user, len = text.len(), "mirror record read"),
            Ok(None) => tracing::debug!(%user, "no mirror record"),
            Err(err) => tracing::error!(%user, "mirror read failed: {}", err),
        }
        result
    }

    /// Current in-memory text for `user`.
    pub fn snapshot(&self, user: &str) -> String {
        self.transcriber.snapshot(user)
    }

    /// Number of users with an in-memory buffer.
    pub fn user_count(&self) -> usize {
        self.transcriber.store().len()
    }

    /// The transcriber.
    pub fn transcriber(&self) -> &Transcriber<E> {
        &self.transcriber
    }

    /// The action executor.
    pub fn executor(&self) -> &ActionExecutor<E> {
        &self.executor
    }

    /// Recover `user`'s buffer if needed. Returns `false` while the stored
    /// record is unreadable and mirror writes must be held back.
    async fn recover(&self, user: &UserId, request_id: u64) -> bool {
        let unrecovered = self.unrecovered().contains(user);
        if !unrecovered && self.transcriber.store().contains(user.as_str()) {
            return true;
        }

        match self.read_mirror(user).await {
            Ok(Some(text)) => {
                let len = text.len();
                if unrecovered {
                    self.transcriber.rebase(user, &text);
                    tracing::info!(request_id, %user, len, "stored record merged into buffer");
                } else if self.transcriber.recover(user, text) {
                    tracing::info!(request_id, %user, len, "buffer recovered from mirror");
                }
                self.unrecovered().remove(user);
                true
            },
            Ok(None) => {
                self.unrecovered().remove(user);
                true
            },
            Err(_) => {
                self.unrecovered().insert(user.clone());
                tracing::warn!(
                    request_id,
                    %user,
                    "recovery failed, writes held back so the stored record is not overwritten"
                );
                false
            },
        }
    }

    fn unrecovered(&self) -> MutexGuard<'_, HashSet<UserId>> {
        self.unrecovered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> std::fmt::Debug for TranscriptionService<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionService")
            .field("transcriber", &self.transcriber)
            .field("executor", &self.executor)
            .field("recover_on_first_use", &self.recover_on_first_use)
            .finish_non_exhaustive()
    }
}
