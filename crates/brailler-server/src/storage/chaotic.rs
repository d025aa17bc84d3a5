use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use brailler_core::{GatewayError, PersistenceGateway, UserId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Gateway wrapper that injects failures and latency.
///
/// Each call first waits `latency` (if set), then fails with
/// [`GatewayError::Unavailable`] with probability `failure_rate`, otherwise
/// delegates to the inner gateway. The RNG is seeded so fault sequences are
/// reproducible.
#[derive(Debug)]
pub struct ChaoticGateway<G> {
    inner: G,
    failure_rate: f64,
    latency: Option<Duration>,
    rng: Mutex<ChaCha8Rng>,
}

impl<G> ChaoticGateway<G>
where
    G: PersistenceGateway,
{
    /// Wrap `inner`, failing a `failure_rate` fraction of calls.
    pub fn new(inner: G, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency: None,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The wrapped gateway.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn disturb(&self, op: &str) -> Result<(), GatewayError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let roll: f64 = self.rng.lock().unwrap_or_else(PoisonError::into_inner).r#gen();
        if roll < self.failure_rate {
            return Err(GatewayError::Unavailable(format!("injected {op} fault")));
        }
        Ok(())
    }
}

#[async_trait]
impl<G> PersistenceGateway for ChaoticGateway<G>
where
    G: PersistenceGateway,
{
    async fn put(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        self.disturb("put").await?;
        self.inner.put(user, text).await
    }

    async fn get(&self, user: &UserId) -> Result<Option<String>, GatewayError> {
        self.disturb("get").await?;
        self.inner.get(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryGateway;

    #[tokio::test]
    async fn always_failing_store_never_writes() {
        let gateway = ChaoticGateway::new(MemoryGateway::new(), 1.0, 7);
        let user = UserId::from("alice");

        assert!(matches!(gateway.put(&user, "a").await, Err(GatewayError::Unavailable(_))));
        assert!(gateway.get(&user).await.is_err());
        assert!(gateway.inner().is_empty());
    }

    #[tokio::test]
    async fn zero_failure_rate_is_transparent() {
        let gateway = ChaoticGateway::new(MemoryGateway::new(), 0.0, 7);
        let user = UserId::from("alice");

        gateway.put(&user, "abc").await.unwrap();
        assert_eq!(gateway.get(&user).await.unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn same_seed_same_faults() {
        async fn outcomes(seed: u64) -> Vec<bool> {
            let gateway = ChaoticGateway::new(MemoryGateway::new(), 0.5, seed);
            let user = UserId::from("u");
            let mut results = Vec::new();
            for _ in 0..32 {
                results.push(gateway.put(&user, "x").await.is_ok());
            }
            results
        }

        assert_eq!(outcomes(42).await, outcomes(42).await);
    }

    #[tokio::test]
    async fn latency_delays_calls() {
        let gateway = ChaoticGateway::new(MemoryGateway::new(), 0.0, 1)
            .with_latency(Duration::from_millis(30));
        let start = std::time::Instant::now();
        gateway.put(&UserId::from("u"), "x").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
