//! HTTP endpoint handlers
//!
//! Handlers translate query parameters to core calls and shape responses.
//! They contain no business logic beyond parsing and validation; errors
//! map to statuses in `error.rs`.

use crate::api::types::*;
use crate::error::{AppError, Result};
use crate::options;
use crate::options::analytics::{self, AnalyticsReport, MaxPain, OiLevel, PcrSummary};
use crate::options::expiry;
use crate::options::snapshot::SnapshotMeta;
use crate::providers::types::{DailyStats, Quote};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============================================================================
// Quotes
// ============================================================================

/// GET /quote/{symbol} - latest cached quote
pub async fn cached_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>> {
    state
        .cache
        .get(&symbol)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No cached quote for {}", symbol.to_uppercase())))
}

/// GET /fetch/{symbol} - live quote via the routed adapter, then cache it
pub async fn fetch_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>> {
    let canonical = symbol.trim().to_uppercase();
    let route = state.router.route(&canonical);
    info!("Live fetch {} via {}", canonical, route.provider.id());

    let mut quote = route.provider.get_quote(&route.upstream_symbol).await?;
    quote.symbol = canonical.clone();
    state.cache.set(&canonical, quote.clone());
    Ok(Json(quote))
}

/// GET /quotes - snapshot of the cache
pub async fn quotes_snapshot(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, Quote>> {
    Json(state.cache.snapshot())
}

/// GET /historical/{symbol}?period=&interval=
pub async fn historical(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoricalQuery>,
) -> Result<Json<HistoricalResponse>> {
    let canonical = symbol.trim().to_uppercase();
    let route = state.router.route(&canonical);
    let data = route
        .provider
        .get_historical(&route.upstream_symbol, &query.period, &query.interval)
        .await?;

    Ok(Json(HistoricalResponse {
        symbol: canonical,
        period: query.period,
        interval: query.interval,
        data,
    }))
}

/// POST /subscribe - idempotent insert into the subscription store
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>> {
    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::Validation("Symbol must not be empty".to_string()));
    }

    let subscribed = state.subscriptions.add(&symbol);
    state.subscriptions.save()?;
    if subscribed {
        info!("Subscribed {}", symbol);
    }

    Ok(Json(SubscribeResponse { symbol, subscribed }))
}

/// POST /unsubscribe - remove a symbol from the subscription store
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>> {
    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::Validation("Symbol must not be empty".to_string()));
    }

    let removed = state.subscriptions.remove(&symbol);
    state.subscriptions.save()?;
    if removed {
        info!("Unsubscribed {}", symbol);
    }

    Ok(Json(UnsubscribeResponse { symbol, removed }))
}

// ============================================================================
// Crypto
// ============================================================================

/// GET /crypto/stats/{symbol} - rolling 24h statistics
pub async fn crypto_stats(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<DailyStats>> {
    let stats = state.router.crypto().get_24h_stats(&symbol).await?;
    Ok(Json(stats))
}

// ============================================================================
// Options
// ============================================================================

/// GET /options/expiries?index=
pub async fn option_expiries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<ExpiriesResponse>> {
    let index = query.index.trim().to_uppercase();
    let expiries = options::available_expiries(&state, &index).await?;
    Ok(Json(ExpiriesResponse { index, expiries }))
}

/// GET /options/index-price?index=
pub async fn index_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexPriceQuery>,
) -> Result<Json<Quote>> {
    let index = query
        .index
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Validation("Missing required query parameter: index".to_string())
        })?
        .to_uppercase();

    if index.ends_with(".NS") || index.ends_with(".BO") {
        return Err(AppError::Validation(format!(
            "'{}' looks like a stock symbol; this endpoint expects an index name (for example: NIFTY, BANKNIFTY)",
            index
        )));
    }

    let quote = state.router.exchange().get_quote(&index).await?;
    Ok(Json(quote))
}

/// GET /options/stock-price?symbol=
pub async fn stock_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockPriceQuery>,
) -> Result<Json<Quote>> {
    let symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Validation("Missing required query parameter: symbol".to_string())
        })?
        .to_uppercase();

    // accept NSE symbols with or without the venue suffix
    let native = symbol.trim_end_matches(".NS").to_string();
    let quote = state.router.exchange().get_quote(&native).await?;
    Ok(Json(quote))
}

/// POST /options/fetch - snapshot at the nearest expiry
pub async fn fetch_options(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchOptionsRequest>,
) -> Result<Json<SnapshotMeta>> {
    let meta = options::fetch_snapshot(&state, &req.index, None, req.num_strikes).await?;
    Ok(Json(meta))
}

/// POST /options/fetch/expiry - snapshot at a specific expiry
pub async fn fetch_options_expiry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchOptionsExpiryRequest>,
) -> Result<Json<SnapshotMeta>> {
    let expiry = expiry::normalize(&req.expiry)?;
    let meta = options::fetch_snapshot(&state, &req.index, Some(&expiry), req.num_strikes).await?;
    Ok(Json(meta))
}

/// GET /options/analytics?index= - analytics of the latest persisted snapshot
pub async fn option_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>> {
    let rows = state.snapshots.load_latest(&query.index)?;
    Ok(Json(analytics::analyze(&rows, query.top_n)))
}

/// GET /options/live-pcr?index= - PCR from a live chain fetch
pub async fn live_pcr(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveChainQuery>,
) -> Result<Json<PcrSummary>> {
    let rows = live_chain(&state, &query).await?;
    Ok(Json(analytics::pcr(&rows)))
}

/// GET /options/live-top-oi?index=&top_n=
pub async fn live_top_oi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveChainQuery>,
) -> Result<Json<TopOiResponse>> {
    let rows = live_chain(&state, &query).await?;
    let (resistance_strikes, support_strikes) = analytics::top_oi(&rows, query.top_n);
    Ok(Json(TopOiResponse {
        resistance_strikes,
        support_strikes,
    }))
}

/// GET /options/live-max-pain?index=
pub async fn live_max_pain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveChainQuery>,
) -> Result<Json<MaxPain>> {
    let rows = live_chain(&state, &query).await?;
    Ok(Json(analytics::max_pain(&rows)))
}

/// GET /options/historical/{symbol} - declared but intentionally a 501
pub async fn option_historical(Path(symbol): Path<String>) -> Result<Json<()>> {
    Err(AppError::NotImplemented(format!(
        "Historical option data for {} is not available",
        symbol
    )))
}

#[derive(Debug, Serialize)]
pub struct TopOiResponse {
    pub resistance_strikes: Vec<OiLevel>,
    pub support_strikes: Vec<OiLevel>,
}

async fn live_chain(
    state: &AppState,
    query: &LiveChainQuery,
) -> Result<Vec<crate::options::chain::FlatRow>> {
    let expiry = match &query.expiry {
        Some(raw) => Some(expiry::normalize(raw)?),
        None => None,
    };
    options::live_rows(state, &query.index, expiry.as_deref()).await
}
