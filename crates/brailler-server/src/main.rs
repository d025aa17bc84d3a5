//! Brailler server binary.
//!
//! # Usage
//!
//! ```bash
//! # In-memory mirror (development)
//! brailler-server --bind 127.0.0.1:5000
//!
//! # Remote key-value mirror with retries and recovery
//! brailler-server --store rest --store-url https://example.firebaseio.com \
//!     --retry-attempts 3 --recover
//! ```

use std::time::Duration;

use brailler_core::TranslationPolicy;
use brailler_server::{
    MirrorConfig, MirrorMode, MirrorPolicy, Server, ServerRuntimeConfig, StoreConfig,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    Memory,
    Rest,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MirrorModeArg {
    Background,
    Inline,
}

/// Braille cell translation server
#[derive(Parser, Debug)]
#[command(name = "brailler-server")]
#[command(about = "Multi-user braille cell translation server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Durable mirror backend
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreKind,

    /// Base URL of the remote store (required with --store rest)
    #[arg(long)]
    store_url: Option<String>,

    /// Auth token appended to remote store requests
    #[arg(long)]
    store_auth: Option<String>,

    /// Whether durable writes happen before or after responding
    #[arg(long, value_enum, default_value = "background")]
    mirror_mode: MirrorModeArg,

    /// Upper bound on a single store call, in milliseconds
    #[arg(long, default_value = "2000")]
    mirror_timeout_ms: u64,

    /// Attempts per durable write (1 disables retries)
    #[arg(long, default_value = "1")]
    retry_attempts: u32,

    /// Initial retry backoff, in milliseconds
    #[arg(long, default_value = "100")]
    retry_backoff_ms: u64,

    /// Reject malformed cells and unknown modes instead of degrading
    #[arg(long)]
    strict: bool,

    /// Seed a user's buffer from the store on their first submission
    #[arg(long)]
    recover: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<ServerRuntimeConfig, String> {
        let store = match self.store {
            StoreKind::Memory => StoreConfig::Memory,
            StoreKind::Rest => StoreConfig::Rest {
                url: self.store_url.ok_or("--store rest requires --store-url")?,
                auth: self.store_auth,
            },
        };

        let policy = if self.retry_attempts > 1 {
            MirrorPolicy::Retry {
                max_attempts: self.retry_attempts,
                initial_backoff_ms: self.retry_backoff_ms,
            }
        } else {
            MirrorPolicy::BestEffort
        };

        let mode = match self.mirror_mode {
            MirrorModeArg::Background => MirrorMode::Background,
            MirrorModeArg::Inline => MirrorMode::Inline,
        };

        Ok(ServerRuntimeConfig {
            bind_address: self.bind,
            store,
            mirror: MirrorConfig {
                mode,
                timeout: Duration::from_millis(self.mirror_timeout_ms),
                policy,
            },
            policy: if self.strict {
                TranslationPolicy::Strict
            } else {
                TranslationPolicy::Permissive
            },
            recover_on_first_use: self.recover,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Brailler server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = args.into_config()?;

    if config.store == StoreConfig::Memory {
        tracing::warn!("Using in-memory mirror - records are lost on restart");
    }
    if config.policy == TranslationPolicy::Strict {
        tracing::info!("Strict translation enabled - malformed cells are rejected");
    }

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
