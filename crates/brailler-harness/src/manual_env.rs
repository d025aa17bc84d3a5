//! Manually driven environment.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use brailler_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Environment with a virtual clock and seeded RNG.
///
/// `sleep` advances the virtual clock and returns immediately, so retry
/// backoff costs no wall-clock time. Clones share the same clock and RNG.
#[derive(Debug, Clone)]
pub struct ManualEnv {
    clock: Arc<Mutex<Instant>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl ManualEnv {
    /// Environment starting at the current instant with RNG `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Instant::now())),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *now += duration;
    }
}

impl Default for ManualEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for ManualEnv {
    fn now(&self) -> Instant {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
