//! Action execution for transcript actions.
//!
//! [`ActionExecutor`] runs the actions a
//! [`Transcriber`](brailler_core::Transcriber) returns: log actions become
//! `tracing` events, mirror actions are handed to the background writer or
//! awaited inline, depending on [`MirrorMode`].
//!
//! Mirror failures never reach the caller. They are logged and counted in
//! [`MirrorStats`].
//!
//! Inline writes for one user are serialized and carry the buffer revision,
//! so a slow write for an older text can never land after a newer one.
//! Writes for different users never wait on each other.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use brailler_core::{
    GatewayError, LogLevel, PersistenceGateway, TranscriptAction, UserId, env::Environment,
};

use crate::{
    config::{MirrorConfig, MirrorMode},
    mirror::{MirrorHandle, MirrorJob, MirrorStats},
};

/// Policy for handling durable write failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorPolicy {
    /// Log failure and move on; the next append re-sends the full text.
    #[default]
    BestEffort,

    /// Retry transient failures with exponential backoff.
    Retry {
        /// Maximum number of attempts, including the first
        max_attempts: u32,
        /// Initial backoff duration in milliseconds
        initial_backoff_ms: u64,
    },
}

impl MirrorPolicy {
    fn max_attempts(self) -> u32 {
        match self {
            Self::BestEffort => 1,
            Self::Retry { max_attempts, .. } => max_attempts.max(1),
        }
    }

    fn backoff(self, attempt: u32) -> Duration {
        match self {
            Self::BestEffort => Duration::ZERO,
            Self::Retry { initial_backoff_ms, .. } => {
                let factor = 1u64 << attempt.saturating_sub(1).min(16);
                Duration::from_millis(initial_backoff_ms.saturating_mul(factor))
            },
        }
    }
}

/// Write `text` for `user`, bounding each attempt by `timeout`.
///
/// Returns the number of attempts made on success.
pub async fn put_with_policy<E>(
    gateway: &dyn PersistenceGateway,
    env: &E,
    user: &UserId,
    text: &str,
    timeout: Duration,
    policy: MirrorPolicy,
) -> Result<u32, GatewayError>
where
    E: Environment,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(timeout, gateway.put(user, text)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(timeout)),
        };

        match result {
            Ok(()) => return Ok(attempt),
            Err(err) if attempt < max_attempts && err.is_transient() => {
                let backoff = policy.backoff(attempt);
                tracing::debug!(%user, attempt, ?backoff, "mirror write failed, retrying: {}", err);
                env.sleep(backoff).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}

/// Executes transcript actions against the durable mirror.
pub struct ActionExecutor<E>
where
    E: Environment,
{
    gateway: Arc<dyn PersistenceGateway>,
    env: E,
    config: MirrorConfig,
    writer: Option<MirrorHandle>,
    stats: Arc<MirrorStats>,
    /// Last revision written inline per user, locked for the whole write.
    inline: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<u64>>>>,
}

impl<E> ActionExecutor<E>
where
    E: Environment,
{
    /// Executor writing inline, or through `writer` in background mode.
    ///
    /// In background mode without a writer, mirror actions are dropped and
    /// counted as failed.
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        env: E,
        config: MirrorConfig,
        writer: Option<MirrorHandle>,
    ) -> Self {
        let stats = writer.as_ref().map_or_else(Arc::default, |w| Arc::clone(w.stats()));
        Self { gateway, env, config, writer, stats, inline: Mutex::default() }
    }

    /// Mirror counters.
    pub fn stats(&self) -> &Arc<MirrorStats> {
        &self.stats
    }

    /// Background writer handle, if running in background mode.
    pub fn writer(&self) -> Option<&MirrorHandle> {
        self.writer.as_ref()
    }

    /// Gateway the mirror writes to.
    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Mirror settings.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Execute `actions` in order.
    pub async fn execute(&self, actions: Vec<TranscriptAction>, request_id: u64) {
        for action in actions {
            match action {
                TranscriptAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!(request_id, "{}", message),
                    LogLevel::Info => tracing::info!(request_id, "{}", message),
                    LogLevel::Warn => tracing::warn!(request_id, "{}", message),
                },

                TranscriptAction::Mirror { user_id, text, revision, processed_at } => {
                    let job = MirrorJob { user_id, text, revision, processed_at };
                    self.mirror(job, request_id).await;
                },
            }
        }
    }

    async fn mirror(&self, job: MirrorJob, request_id: u64) {
        match self.config.mode {
            MirrorMode::Background => match &self.writer {
                Some(writer) => {
                    if !writer.enqueue(job) {
                        tracing::error!(request_id, "mirror writer stopped, write dropped");
                    }
                },
                None => {
                    self.stats.record_failed();
                    tracing::error!(request_id, user = %job.user_id, "no mirror writer running");
                },
            },

            MirrorMode::Inline => self.mirror_inline(job, request_id).await,
        }
    }

    async fn mirror_inline(&self, job: MirrorJob, request_id: u64) {
        let slot = self.inline_slot(&job.user_id);
        let mut written = slot.lock().await;
        if *written >= job.revision {
            self.stats.record_coalesced();
            tracing::debug!(
                request_id,
                user = %job.user_id,
                revision = job.revision,
                "stale inline write skipped"
            );
            return;
        }

        self.stats.record_attempted();
        match put_with_policy(
            self.gateway.as_ref(),
            &self.env,
            &job.user_id,
            &job.text,
            self.config.timeout,
            self.config.policy,
        )
        .await
        {
            Ok(attempts) => {
                self.stats.record_succeeded();
                *written = job.revision;
                let lag = self.env.now().saturating_duration_since(job.processed_at);
                tracing::debug!(
                    request_id,
                    user = %job.user_id,
                    revision = job.revision,
                    attempts,
                    ?lag,
                    "mirrored inline"
                );
            },
            Err(err) => {
                self.stats.record_failed();
                tracing::warn!(
                    request_id,
                    user = %job.user_id,
                    revision = job.revision,
                    "mirror write failed: {}",
                    err
                );
            },
        }
    }

    fn inline_slot(&self, user: &UserId) -> Arc<tokio::sync::Mutex<u64>> {
        let mut slots = self.inline.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(user.clone()).or_default())
    }
}

impl<E> std::fmt::Debug for ActionExecutor<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
