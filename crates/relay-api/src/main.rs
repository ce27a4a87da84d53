//! # Payment Relay
//!
//! Routes payments between a default and a fallback processor.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PROCESSOR_DEFAULT_URL=http://payment-processor-default:8080
//! export PROCESSOR_FALLBACK_URL=http://payment-processor-fallback:8080
//! export REDIS_URL=redis://redis:6379
//!
//! # Optional tuning file
//! export RELAY_CONFIG=config/relay.toml
//!
//! # Run the server
//! payment-relay
//! ```

use relay_api::{routes, AppConfig, Relay};
use relay_core::{CancellationToken, ProcessorKind, Processors};
use relay_upstream::{HttpProcessor, RedisSortedStore, UpstreamConfig};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = AppConfig::from_env()?;
    let upstream = UpstreamConfig::from_env()?;
    let addr = config.socket_addr()?;
    let tuning = config.tuning.clone();

    // Processors
    let processor = |kind: ProcessorKind| {
        HttpProcessor::new(
            kind,
            upstream.processor_url(kind),
            tuning.payment_timeout(),
            tuning.probe_timeout(),
        )
    };
    let processors = Processors::new(
        Arc::new(processor(ProcessorKind::Default)?),
        Arc::new(processor(ProcessorKind::Fallback)?),
    )?;

    // Ledger store; refuse to serve without it
    let store = RedisSortedStore::connect(&upstream.redis_url).await?;

    info!("Default processor: {}", upstream.default_url);
    info!("Fallback processor: {}", upstream.fallback_url);
    info!(
        "Workers: {}, fallback policy: {:?}, probe failure policy: {:?}",
        tuning.workers, tuning.fallback_policy, tuning.probe_failure_policy
    );

    let cancel = CancellationToken::new();
    let relay = Relay::assemble(config, processors, Arc::new(store), cancel.clone());
    let app = routes::create_router(relay.state.clone());

    info!("Payment relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    relay.workers.shutdown().await;
    info!("Payment relay stopped");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels the workers
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}
