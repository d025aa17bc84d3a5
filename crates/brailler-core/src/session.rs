//! Per-user accumulated text.
//!
//! ## Concurrency
//!
//! The store keeps a map from [`UserId`] to a separately locked
//! [`SessionBuffer`]. The map lock is only held to find or create a buffer,
//! so unrelated users never wait on each other's appends. The per-buffer lock
//! serializes appends for one user: the order in which appends acquire it is
//! the order their symbols appear in the text.
//!
//! Neither lock is held across an `.await`; both are `std::sync` locks.
//! A poisoned lock is recovered rather than propagated, since a buffer is
//! only ever left in a state produced by a completed `push_str`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use crate::user::UserId;

/// One user's accumulated text.
///
/// Grows by append only, except that recovery may put a stored record in
/// front of it. Never truncated.
#[derive(Debug, Clone, Default)]
pub struct SessionBuffer {
    text: String,
    revision: u64,
}

impl SessionBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn seeded(text: String) -> Self {
        Self { text, revision: 0 }
    }

    /// Append `symbol` and return the new revision.
    pub fn append(&mut self, symbol: &str) -> u64 {
        self.text.push_str(symbol);
        self.revision += 1;
        self.revision
    }

    /// Current accumulated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of appends accepted by this buffer.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Result of a single append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Full text after the append.
    pub text: String,
    /// Buffer revision after the append. Strictly increasing per user.
    pub revision: u64,
}

/// Process-wide mapping from user to accumulated text.
#[derive(Debug, Default)]
pub struct SessionStore {
    buffers: RwLock<HashMap<UserId, Arc<Mutex<SessionBuffer>>>>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `symbol` to `user`'s buffer, creating it on first use.
    pub fn append(&self, user: &UserId, symbol: &str) -> Appended {
        let buffer = self.get_or_create(user);
        let mut buffer = lock(&buffer);
        let revision = buffer.append(symbol);
        Appended { text: buffer.text.clone(), revision }
    }

    /// Current text for `user`, or empty text for an unknown user.
    pub fn snapshot(&self, user: &str) -> String {
        self.get(user)
            .map(|buffer| {
                let buffer = lock(&buffer);
                buffer.text.clone()
            })
            .unwrap_or_default()
    }

    /// Current revision for `user`, or `0` for an unknown user.
    pub fn revision(&self, user: &str) -> u64 {
        self.get(user).map_or(0, |buffer| {
            let buffer = lock(&buffer);
            buffer.revision
        })
    }

    /// Create `user`'s buffer holding `text`, unless a buffer already exists.
    ///
    /// Returns `true` if the buffer was created. An existing buffer is never
    /// overwritten, so in-memory state stays authoritative once it exists.
    pub fn seed(&self, user: &UserId, text: String) -> bool {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        if buffers.contains_key(user) {
            return false;
        }
        buffers.insert(user.clone(), Arc::new(Mutex::new(SessionBuffer::seeded(text))));
        true
    }

    /// Put `prefix` in front of `user`'s text, creating the buffer if needed.
    ///
    /// Used when a stored record becomes readable only after the user has
    /// already appended cells. Bumps the revision so the merged text
    /// supersedes anything mirrored before.
    pub fn rebase(&self, user: &UserId, prefix: &str) -> Appended {
        let buffer = self.get_or_create(user);
        let mut buffer = lock(&buffer);
        buffer.text.insert_str(0, prefix);
        buffer.revision += 1;
        Appended { text: buffer.text.clone(), revision: buffer.revision }
    }

    /// Whether `user` has a buffer.
    pub fn contains(&self, user: &str) -> bool {
        self.buffers.read().unwrap_or_else(PoisonError::into_inner).contains_key(user)
    }

    /// Number of buffers.
    pub fn len(&self) -> usize {
        self.buffers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no user has a buffer yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All users with a buffer, sorted.
    pub fn users(&self) -> Vec<UserId> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        let mut users: Vec<_> = buffers.keys().cloned().collect();
        users.sort();
        users
    }

    fn get(&self, user: &str) -> Option<Arc<Mutex<SessionBuffer>>> {
        self.buffers.read().unwrap_or_else(PoisonError::into_inner).get(user).cloned()
    }

    fn get_or_create(&self, user: &UserId) -> Arc<Mutex<SessionBuffer>> {
        if let Some(buffer) = self.get(user.as_str()) {
            return buffer;
        }

        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(buffers.entry(user.clone()).or_default())
    }
}

fn lock(buffer: &Mutex<SessionBuffer>) -> MutexGuard<'_, SessionBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}
