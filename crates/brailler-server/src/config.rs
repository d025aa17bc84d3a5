//! Runtime configuration.
//!
//! Plain structs with defaults. The binary maps CLI arguments into these;
//! library code only ever sees the structs.

use std::time::Duration;

use brailler_core::TranslationPolicy;

use crate::executor::MirrorPolicy;

/// Which persistence gateway backs the durable mirror.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreConfig {
    /// In-process map; contents are lost on restart.
    #[default]
    Memory,

    /// Remote key-value store over HTTP/JSON.
    Rest {
        /// Base URL of the store (e.g. `https://example.firebaseio.com`)
        url: String,
        /// Optional `auth` query token appended to every request
        auth: Option<String>,
    },
}

/// When the durable write happens relative to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// Respond immediately; a background writer mirrors the text.
    #[default]
    Background,

    /// Await the bounded write before responding. Failures are still only
    /// logged.
    Inline,
}

/// Durable mirror settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Background or inline writes
    pub mode: MirrorMode,
    /// Upper bound on a single gateway call
    pub timeout: Duration,
    /// Failure handling
    pub policy: MirrorPolicy,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mode: MirrorMode::default(),
            timeout: Duration::from_secs(2),
            policy: MirrorPolicy::default(),
        }
    }
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "127.0.0.1:5000")
    pub bind_address: String,
    /// Persistence backend
    pub store: StoreConfig,
    /// Durable mirror behavior
    pub mirror: MirrorConfig,
    /// Translation policy for submitted cells
    pub policy: TranslationPolicy,
    /// Seed a user's buffer from the mirror on their first submission
    pub recover_on_first_use: bool,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            store: StoreConfig::default(),
            mirror: MirrorConfig::default(),
            policy: TranslationPolicy::default(),
            recover_on_first_use: false,
        }
    }
}
