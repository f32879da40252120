//! QuoteHub - market data aggregation service
//!
//! Unifies heterogeneous upstream quote providers (equities, crypto spot,
//! forex, exchange option chains) behind a single typed HTTP interface,
//! keeps a polled in-memory view of subscribed symbols, and serves
//! derived analytics over persisted option-chain snapshots.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod options;
pub mod poller;
pub mod providers;
pub mod router;
pub mod state;
pub mod subscriptions;

use config::Config;
use error::Result;
use poller::Poller;
use state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging, wire the state, start the poller and serve HTTP
/// until interrupted
pub async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotehub=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting QuoteHub...");

    let config = Config::from_env();
    let state = Arc::new(AppState::new(config));

    let cancel = CancellationToken::new();

    let poller = Poller::new(state.clone()).spawn(cancel.clone());

    // Ctrl-C trips the token; the poller and the server both observe it
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let result = api::serve(state, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = poller.await {
        tracing::error!("Poller task failed: {}", e);
    }

    result
}
