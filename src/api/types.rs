//! HTTP request and response types

use crate::providers::types::HistoricalBar;
use serde::{Deserialize, Serialize};

fn default_num_strikes() -> usize {
    25
}

fn default_top_n() -> usize {
    5
}

fn default_period() -> String {
    "1d".to_string()
}

fn default_interval() -> String {
    "1d".to_string()
}

/// POST /subscribe
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub symbol: String,
    /// false when the symbol was already subscribed
    pub subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub symbol: String,
    /// false when the symbol was not subscribed
    pub removed: bool,
}

/// GET /historical/{symbol}
#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_interval")]
    pub interval: String,
}

#[derive(Debug, Serialize)]
pub struct HistoricalResponse {
    pub symbol: String,
    pub period: String,
    pub interval: String,
    pub data: Vec<HistoricalBar>,
}

/// GET /options/expiries, /options/analytics
#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub index: String,
}

#[derive(Debug, Serialize)]
pub struct ExpiriesResponse {
    pub index: String,
    pub expiries: Vec<String>,
}

/// GET /options/index-price
#[derive(Debug, Deserialize)]
pub struct IndexPriceQuery {
    pub index: Option<String>,
}

/// GET /options/stock-price
#[derive(Debug, Deserialize)]
pub struct StockPriceQuery {
    pub symbol: Option<String>,
}

/// POST /options/fetch
#[derive(Debug, Deserialize)]
pub struct FetchOptionsRequest {
    pub index: String,
    #[serde(default = "default_num_strikes")]
    pub num_strikes: usize,
}

/// POST /options/fetch/expiry
#[derive(Debug, Deserialize)]
pub struct FetchOptionsExpiryRequest {
    pub index: String,
    /// `DDMMYY` or `DD-MMM-YYYY`
    pub expiry: String,
    #[serde(default = "default_num_strikes")]
    pub num_strikes: usize,
}

/// GET /options/live-*
#[derive(Debug, Deserialize)]
pub struct LiveChainQuery {
    pub index: String,
    pub expiry: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

/// GET /options/analytics
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub index: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
