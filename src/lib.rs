//! # Crafty Exporter
//!
//! Polls one or more Crafty Controller instances on a fixed interval and republishes the status of their game servers
//! as Prometheus metrics.
//!
//! - **`client`**: authenticates against one instance and fetches server listings and stats
//! - **`aggregator`**: walks all instances, merges listings with stats and publishes a [`Snapshot`]
//! - **`metrics`**: converts the latest snapshot into metric families on every scrape
//! - **`scheduler`**: the refresh loop
//! - **`http`**: the `/metrics` endpoint

#[macro_use]
extern crate tracing;

pub mod aggregator;
pub mod client;
pub mod error;
pub mod http;
mod logging;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod snapshot;

pub use aggregator::StatusAggregator;
pub use client::CraftyClient;
pub use crafty_exporter_config::{
    Args,
    InstanceConfig,
    Settings,
};
pub use logging::{
    init_errors,
    init_logging,
};
pub use snapshot::{
    Snapshot,
    SnapshotStore,
};

use eyre::WrapErr as _;
use tokio::net::TcpListener;

/// Bind the metrics endpoint and run the refresh loop until the process is asked to stop.
pub async fn run(settings: Settings) -> eyre::Result<()> {
    let store = SnapshotStore::new();
    let aggregator = StatusAggregator::new(
        &settings.crafty_instances,
        settings.api_timeout(),
        store.clone(),
        settings.snapshot_file.clone(),
    )?;

    let address = settings.listen_socket();
    let listener = TcpListener::bind(address)
        .await
        .wrap_err_with(|| format!("failed to bind metrics endpoint on {address}"))?;
    info!("listening on {address}");

    let refresh = tokio::spawn(scheduler::run(aggregator, settings.polling_interval()));

    axum::serve(listener, http::create_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to listen for SIGTERM: {err}");
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
    info!("shutdown requested");
}
