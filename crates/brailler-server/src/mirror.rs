//! Background mirror writer.
//!
//! Decouples durable writes from the request path. Handlers enqueue a
//! [`MirrorJob`] and respond immediately; a single writer task drains the
//! queue and writes to the gateway.
//!
//! ## Ordering
//!
//! Every job carries the buffer revision its text corresponds to. Jobs for
//! one user may be enqueued out of revision order when requests race, so the
//! writer:
//!
//! 1. Coalesces each drained batch to the highest revision per user (the
//!    record is a full mirror, older texts are prefixes of newer ones)
//! 2. Skips any job whose revision is not newer than the last revision it
//!    mirrored for that user
//!
//! The remote record therefore only ever moves forward.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use brailler_core::{PersistenceGateway, UserId, env::Environment};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{config::MirrorConfig, executor::put_with_policy};

/// One durable write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorJob {
    /// Record key.
    pub user_id: UserId,
    /// Full text to store.
    pub text: String,
    /// Buffer revision of `text`.
    pub revision: u64,
    /// When the append producing `text` happened.
    pub processed_at: Instant,
}

/// Mirror write counters.
#[derive(Debug, Default)]
pub struct MirrorStats {
    enqueued: AtomicU64,
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
}

/// Point-in-time copy of [`MirrorStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorCounts {
    /// Jobs handed to the background writer.
    pub enqueued: u64,
    /// Writes sent to the gateway.
    pub attempted: u64,
    /// Writes the gateway accepted.
    pub succeeded: u64,
    /// Writes that failed after all attempts.
    pub failed: u64,
    /// Jobs dropped because a newer revision superseded them.
    pub coalesced: u64,
}

impl MirrorStats {
    pub(crate) fn record_attempted(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of all counters.
    pub fn counts(&self) -> MirrorCounts {
        MirrorCounts {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            attempted: self.attempted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

enum Command {
    Write(MirrorJob),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Sending side of the background writer.
///
/// The writer exits after [`MirrorHandle::shutdown`], or once every handle is
/// dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    tx: mpsc::UnboundedSender<Command>,
    stats: Arc<MirrorStats>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write(job) => f.debug_tuple("Write").field(job).finish(),
            Self::Flush(_) => f.write_str("Flush"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl MirrorHandle {
    /// Queue `job`. Returns `false` if the writer has stopped.
    pub fn enqueue(&self, job: MirrorJob) -> bool {
        let sent = self.tx.send(Command::Write(job)).is_ok();
        if sent {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.record_failed();
        }
        sent
    }

    /// Wait until every job queued before this call has been processed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Stop the writer once every job queued before this call is written.
    ///
    /// Jobs enqueued afterwards are rejected.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    /// Counters shared with the writer task.
    pub fn stats(&self) -> &Arc<MirrorStats> {
        &self.stats
    }
}

/// Start the background writer on the current Tokio runtime.
pub fn spawn_mirror_writer<E>(
    gateway: Arc<dyn PersistenceGateway>,
    env: E,
    config: MirrorConfig,
) -> (MirrorHandle, JoinHandle<()>)
where
    E: Environment,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(MirrorStats::default());
    let writer = MirrorWriter {
        gateway,
        env,
        config,
        stats: Arc::clone(&stats),
        mirrored: HashMap::new(),
    };

    let task = tokio::spawn(writer.run(rx));
    (MirrorHandle { tx, stats }, task)
}

struct MirrorWriter<E> {
    gateway: Arc<dyn PersistenceGateway>,
    env: E,
    config: MirrorConfig,
    stats: Arc<MirrorStats>,
    /// Last revision successfully mirrored per user.
    mirrored: HashMap<UserId, u64>,
}

impl<E> MirrorWriter<E>
where
    E: Environment,
{
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("mirror writer started");

        let mut stopping = false;
        while let Some(first) = rx.recv().await {
            let mut batch: Vec<MirrorJob> = Vec::new();
            let mut acks = Vec::new();
            let mut next = Some(first);

            // Drain what is already queued, stopping at a flush or shutdown
            // so it only waits for jobs queued before it.
            while let Some(command) = next.take() {
                match command {
                    Command::Write(job) => {
                        self.coalesce(&mut batch, job);
                        next = rx.try_recv().ok();
                    },
                    Command::Flush(ack) => acks.push(ack),
                    Command::Shutdown => stopping = true,
                }
            }

            for job in batch {
                self.write(job).await;
            }

            for ack in acks {
                let _ = ack.send(());
            }

            if stopping {
                rx.close();
                break;
            }
        }

        tracing::debug!("mirror writer stopped");
    }

    fn coalesce(&self, batch: &mut Vec<MirrorJob>, job: MirrorJob) {
        match batch.iter_mut().find(|queued| queued.user_id == job.user_id) {
            Some(queued) => {
                self.stats.record_coalesced();
                if job.revision > queued.revision {
                    *queued = job;
                }
            },
            None => batch.push(job),
        }
    }

    async fn write(&mut self, job: MirrorJob) {
        if self.mirrored.get(&job.user_id).is_some_and(|&done| done >= job.revision) {
            self.stats.record_coalesced();
            tracing::trace!(user = %job.user_id, revision = job.revision, "stale mirror write skipped");
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
                let lag = self.env.now().saturating_duration_since(job.processed_at);
                tracing::debug!(
                    user = %job.user_id,
                    revision = job.revision,
                    attempts,
                    ?lag,
                    "mirrored"
                );
                self.mirrored.insert(job.user_id, job.revision);
            },
            Err(err) => {
                self.stats.record_failed();
                tracing::warn!(
                    user = %job.user_id,
                    revision = job.revision,
                    "mirror write failed: {}",
                    err
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use brailler_core::GatewayError;

    use super::*;
    use crate::{
        SystemEnv,
        storage::{ChaoticGateway, MemoryGateway},
    };

    fn job(user: &str, text: &str, revision: u64) -> MirrorJob {
        MirrorJob {
            user_id: UserId::from(user),
            text: text.to_string(),
            revision,
            processed_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn flush_waits_for_queued_writes() {
        let gateway = Arc::new(MemoryGateway::new());
        let (handle, _task) =
            spawn_mirror_writer(gateway.clone(), SystemEnv, MirrorConfig::default());

        assert!(handle.enqueue(job("alice", "a", 1)));
        assert!(handle.enqueue(job("bob", "1", 1)));
        handle.flush().await;

        assert_eq!(gateway.record("alice"), Some("a".to_string()));
        assert_eq!(gateway.record("bob"), Some("1".to_string()));
    }

    #[tokio::test]
    async fn out_of_order_revisions_never_regress() {
        let gateway = Arc::new(MemoryGateway::new());
        let (handle, _task) =
            spawn_mirror_writer(gateway.clone(), SystemEnv, MirrorConfig::default());

        handle.enqueue(job("alice", "ab", 2));
        handle.flush().await;
        handle.enqueue(job("alice", "a", 1));
        handle.flush().await;

        assert_eq!(gateway.record("alice"), Some("ab".to_string()));
        assert_eq!(gateway.put_count(), 1);
        assert_eq!(handle.stats().counts().coalesced, 1);
    }

    #[tokio::test]
    async fn queued_writes_for_one_user_coalesce() {
        let slow = Arc::new(
            ChaoticGateway::new(MemoryGateway::new(), 0.0, 1)
                .with_latency(Duration::from_millis(50)),
        );
        let (handle, _task) = spawn_mirror_writer(slow.clone(), SystemEnv, MirrorConfig::default());

        // First write occupies the writer; the rest pile up and coalesce.
        handle.enqueue(job("alice", "a", 1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.enqueue(job("alice", "ab", 2));
        handle.enqueue(job("alice", "abc", 3));
        handle.enqueue(job("alice", "abcd", 4));
        handle.flush().await;

        assert_eq!(slow.inner().record("alice"), Some("abcd".to_string()));
        assert!(slow.inner().put_count() < 4);

        let counts = handle.stats().counts();
        assert_eq!(counts.enqueued, 4);
        assert_eq!(counts.succeeded + counts.coalesced, 4);
    }

    #[tokio::test]
    async fn failures_are_counted_and_writer_keeps_running() {
        let chaotic = Arc::new(ChaoticGateway::new(MemoryGateway::new(), 1.0, 3));
        let (handle, _task) =
            spawn_mirror_writer(chaotic.clone(), SystemEnv, MirrorConfig::default());

        handle.enqueue(job("alice", "a", 1));
        handle.flush().await;
        handle.enqueue(job("bob", "1", 1));
        handle.flush().await;

        let counts = handle.stats().counts();
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.succeeded, 0);
        assert!(chaotic.inner().is_empty());
    }

    #[tokio::test]
    async fn writer_drains_queue_on_shutdown() {
        let gateway = Arc::new(MemoryGateway::new());
        let (handle, task) =
            spawn_mirror_writer(gateway.clone(), SystemEnv, MirrorConfig::default());

        handle.enqueue(job("alice", "a", 1));
        drop(handle);
        task.await.unwrap();

        assert_eq!(gateway.record("alice"), Some("a".to_string()));
    }

    #[tokio::test]
    async fn shutdown_writes_queued_jobs_then_rejects_new_ones() {
        let gateway = Arc::new(MemoryGateway::new());
        let (handle, task) =
            spawn_mirror_writer(gateway.clone(), SystemEnv, MirrorConfig::default());

        handle.enqueue(job("alice", "a", 1));
        handle.shutdown();
        task.await.unwrap();

        assert_eq!(gateway.record("alice"), Some("a".to_string()));
        assert!(!handle.enqueue(job("alice", "ab", 2)));
        assert_eq!(handle.stats().counts().failed, 1);
    }

    #[test]
    fn gateway_errors_render_for_logs() {
        let err = GatewayError::Timeout(Duration::from_millis(20));
        assert_eq!(err.to_string(), "store call timed out after 20ms");
    }
}
