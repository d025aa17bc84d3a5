//! Brailler production server.
//!
//! This crate provides the production binding of the translation engine:
//! - Axum for the HTTP/JSON transport
//! - Tokio for the async runtime and the background mirror writer
//! - Pluggable persistence gateways for the durable mirror
//!
//! ## Architecture
//!
//! ```text
//! brailler-server
//!   ├─ SystemEnv             (production Environment impl)
//!   ├─ http::router          (HTTP/JSON binding)
//!   ├─ TranscriptionService  (submit / read orchestration, recovery)
//!   ├─ Transcriber           (translation + accumulation, from core)
//!   ├─ ActionExecutor        (executes transcript actions)
//!   ├─ MirrorWriter          (decoupled, ordered durable writes)
//!   └─ Gateways              (memory / chaotic / REST)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod error;
mod executor;
pub mod http;
mod mirror;
mod service;
pub mod storage;
mod system_env;

use std::{future::Future, sync::Arc};

use brailler_core::{PersistenceGateway, Transcriber, Translator};
pub use config::{MirrorConfig, MirrorMode, ServerRuntimeConfig, StoreConfig};
pub use error::ServerError;
pub use executor::{ActionExecutor, MirrorPolicy, put_with_policy};
pub use mirror::{MirrorCounts, MirrorHandle, MirrorJob, MirrorStats, spawn_mirror_writer};
pub use service::TranscriptionService;
pub use storage::{ChaoticGateway, MemoryGateway, RestGateway, build_gateway};
pub use system_env::SystemEnv;
use tokio::{net::TcpListener, task::JoinHandle};

/// Production brailler server.
///
/// Owns the listener, the shared service, and the background mirror writer
/// (in background mirror mode).
pub struct Server {
    /// Bound HTTP listener
    listener: TcpListener,
    /// Shared request service
    service: Arc<TranscriptionService<SystemEnv>>,
    /// Background mirror writer task
    writer: Option<JoinHandle<()>>,
}

impl Server {
    /// Create and bind a new server using the gateway `config.store` selects.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The store configuration is invalid
    /// - Binding to the address fails
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let gateway = build_gateway(&config.store, &config.mirror)?;
        Self::bind_with_gateway(config, gateway).await
    }

    /// Create and bind a new server mirroring into `gateway`.
    pub async fn bind_with_gateway(
        config: ServerRuntimeConfig,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Result<Self, ServerError> {
        let env = SystemEnv::new();

        let (handle, writer) = match config.mirror.mode {
            MirrorMode::Background => {
                let (handle, task) =
                    spawn_mirror_writer(Arc::clone(&gateway), env, config.mirror);
                (Some(handle), Some(task))
            },
            MirrorMode::Inline => (None, None),
        };

        let transcriber =
            Transcriber::with_policy(env, Arc::new(Translator::new()), config.policy);
        let executor = ActionExecutor::new(gateway, env, config.mirror, handle);
        let service = Arc::new(TranscriptionService::new(
            transcriber,
            executor,
            config.recover_on_first_use,
        ));

        let listener = TcpListener::bind(&config.bind_address).await?;

        Ok(Self { listener, service, writer })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared request service.
    pub fn service(&self) -> &Arc<TranscriptionService<SystemEnv>> {
        &self.service
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the server until `shutdown` completes, then drain the mirror
    /// queue.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let Self { listener, service, writer } = self;
        let app = http::router(Arc::clone(&service));

        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        tracing::info!("Server stopped, draining mirror queue");
        if let Some(handle) = service.executor().writer() {
            handle.shutdown();
        }
        if let Some(writer) = writer {
            writer.await.map_err(|e| ServerError::Internal(e.to_string()))?;
        }

        let counts = service.executor().stats().counts();
        tracing::info!(
            attempted = counts.attempted,
            succeeded = counts.succeeded,
            failed = counts.failed,
            "Mirror writer stopped"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listener", &self.listener)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}
