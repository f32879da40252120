//! HTTP server
//!
//! Thin axum surface over the core: route table, CORS and request
//! tracing, graceful shutdown tied to the service cancellation token.

pub mod handlers;
pub mod types;

use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Assemble the route table
pub fn build_router(state: Arc<AppState>) -> Router {
    // allow-all CORS for local dashboards
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // quotes
        .route("/quote/:symbol", get(handlers::cached_quote))
        .route("/fetch/:symbol", get(handlers::fetch_quote))
        .route("/quotes", get(handlers::quotes_snapshot))
        .route("/historical/:symbol", get(handlers::historical))
        .route("/subscribe", post(handlers::subscribe))
        .route("/unsubscribe", post(handlers::unsubscribe))
        // crypto
        .route("/crypto/stats/:symbol", get(handlers::crypto_stats))
        // options
        .route("/options/expiries", get(handlers::option_expiries))
        .route("/options/index-price", get(handlers::index_price))
        .route("/options/stock-price", get(handlers::stock_price))
        .route("/options/fetch", post(handlers::fetch_options))
        .route("/options/fetch/expiry", post(handlers::fetch_options_expiry))
        .route("/options/analytics", get(handlers::option_analytics))
        .route("/options/live-pcr", get(handlers::live_pcr))
        .route("/options/live-top-oi", get(handlers::live_top_oi))
        .route("/options/live-max-pain", get(handlers::live_max_pain))
        .route("/options/historical/:symbol", get(handlers::option_historical))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the cancellation token fires
pub async fn serve(state: Arc<AppState>, cancel: CancellationToken) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| AppError::Validation(format!("Invalid bind address: {}", e)))?;

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            info!("HTTP server shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_router_builds() {
        let dir = tempdir().unwrap();
        let config = Config {
            subscriptions_file: dir.path().join("subscriptions.json"),
            snapshot_dir: dir.path().join("option_chain_data"),
            default_symbols: Vec::new(),
            ..Config::default()
        };
        let state = Arc::new(AppState::new(config));
        let _ = build_router(state);
    }
}
