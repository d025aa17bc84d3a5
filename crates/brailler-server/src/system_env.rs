//! Wall-clock environment for the running server.
//!
//! Buffer timestamps and mirror lag come from the monotonic clock, retry
//! backoff sleeps on the Tokio timer, and request ids are drawn from OS
//! randomness so log lines from concurrent submissions can be told apart.

use std::time::{Duration, Instant};

use brailler_core::env::Environment;

/// [`Environment`] backed by the OS clock, Tokio timers and `getrandom`.
///
/// Zero-sized and `Copy`: the transcriber, executor and mirror writer each
/// hold their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// The system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            // Request ids only correlate log lines.
            tracing::error!("getrandom failed, request ids will repeat: {}", e);
            buffer.fill(0);
        }
    }
}
