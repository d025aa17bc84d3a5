//! Durable mirror abstraction.
//!
//! The engine depends on, but does not implement, a remote key-value store
//! holding one record per user whose single text field equals that user's
//! full accumulated text. Drivers provide implementations; the server crate
//! ships in-memory, fault-injecting and REST-backed ones.
//!
//! # Contract
//!
//! - `put` is an unconditional overwrite with the *entire* current text
//! - `get` returns `Ok(None)` when no record exists, which callers must keep
//!   distinguishable from `Err` (an unreachable store)
//! - The mirror is never authoritative for live requests: the in-memory
//!   [`SessionStore`](crate::SessionStore) is

use std::time::Duration;

use async_trait::async_trait;

use crate::user::UserId;

/// Errors from a persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within the configured bound.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered but refused the request.
    #[error("store rejected request ({status}): {reason}")]
    Rejected {
        /// Status code returned by the store.
        status: u16,
        /// Reason given by the store.
        reason: String,
    },

    /// The stored record could not be decoded.
    #[error("malformed record: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Durable key-value mirror of accumulated text.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Overwrite `user`'s record with `text`.
    async fn put(&self, user: &UserId, text: &str) -> Result<(), GatewayError>;

    /// Read `user`'s record, or `None` if none exists.
    async fn get(&self, user: &UserId) -> Result<Option<String>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_transient() {
        assert!(GatewayError::Unavailable("refused".to_string()).is_transient());
        assert!(GatewayError::Timeout(Duration::from_secs(2)).is_transient());
    }

    #[test]
    fn only_server_side_rejections_are_transient() {
        let throttled = GatewayError::Rejected { status: 429, reason: "slow down".to_string() };
        let unauthorized = GatewayError::Rejected { status: 401, reason: "denied".to_string() };
        let outage = GatewayError::Rejected { status: 503, reason: "down".to_string() };
        assert!(throttled.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(outage.is_transient());
    }

    #[test]
    fn decode_errors_are_permanent() {
        assert!(!GatewayError::Decode("not json".to_string()).is_transient());
    }

    #[test]
    fn error_display() {
        let err = GatewayError::Rejected { status: 401, reason: "denied".to_string() };
        assert_eq!(err.to_string(), "store rejected request (401): denied");
    }
}
