//! Persistence gateway implementations.
//!
//! - [`MemoryGateway`]: in-process map, the default backend
//! - [`ChaoticGateway`]: wraps another gateway and injects failures/latency
//! - [`RestGateway`]: remote key-value store over HTTP/JSON

mod chaotic;
mod memory;
mod rest;

use std::sync::Arc;

use brailler_core::PersistenceGateway;
pub use chaotic::ChaoticGateway;
pub use memory::MemoryGateway;
pub use rest::{RestGateway, TranslationRecord};

use crate::{
    config::{MirrorConfig, StoreConfig},
    error::ServerError,
};

/// Build the gateway selected by `store`.
pub fn build_gateway(
    store: &StoreConfig,
    mirror: &MirrorConfig,
) -> Result<Arc<dyn PersistenceGateway>, ServerError> {
    match store {
        StoreConfig::Memory => Ok(Arc::new(MemoryGateway::new())),
        StoreConfig::Rest { url, auth } => {
            Ok(Arc::new(RestGateway::new(url, auth.clone(), mirror.timeout)?))
        },
    }
}
