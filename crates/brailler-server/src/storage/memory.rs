use std::{
    collections::HashMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use brailler_core::{GatewayError, PersistenceGateway, UserId};

/// In-memory durable mirror.
///
/// Records live for the process lifetime. Counts writes so tests can observe
/// how many puts reached the store.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: RwLock<HashMap<UserId, String>>,
    puts: AtomicU64,
}

impl MemoryGateway {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored text for `user`, bypassing the async interface.
    pub fn record(&self, user: &str) -> Option<String> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).get(user).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn put(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.clone(), text.to_string());
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get(&self, user: &UserId) -> Result<Option<String>, GatewayError> {
        Ok(self.record(user.as_str()))
    }
}
