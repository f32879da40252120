//! NSE exchange adapter
//!
//! Serves raw option chains for index derivatives plus native index and
//! stock quotes. NSE responses are polymorphic: index quotes carry
//! `lastPrice` or `underlyingValue` at the top level, stock quotes nest
//! prices under `priceInfo`, and numeric fields sometimes arrive as
//! strings with thousands separators. The endpoints also refuse clients
//! without browser-like headers and a warmed session cookie.

use crate::error::{classify_status, AppError, Result};
use crate::providers::types::{OptionChainRaw, Quote, StringOrFloat};
use crate::providers::{local_timestamp, Provider};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

const BASE_URL: &str = "https://www.nseindia.com";

pub struct NseProvider {
    client: Client,
    session: OnceCell<()>,
}

impl NseProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .cookie_store(true)
                .default_headers(Self::headers())
                .build()
                .expect("Failed to create HTTP client"),
            session: OnceCell::new(),
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nseindia.com/"));
        headers
    }

    /// Prime the session cookie once; API endpoints reject cold clients
    async fn ensure_session(&self) -> Result<()> {
        self.session
            .get_or_try_init(|| async {
                debug!("Warming NSE session");
                self.client.get(BASE_URL).send().await?;
                Ok::<(), AppError>(())
            })
            .await?;
        Ok(())
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        self.ensure_session().await?;
        let response = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                format!("NSE request {} failed with {}", path, status),
            ));
        }
        Ok(response.json().await?)
    }
}

impl Default for NseProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull a numeric field that may be a number or a comma-grouped string
fn numeric(value: &Value) -> Option<f64> {
    serde_json::from_value::<StringOrFloat>(value.clone())
        .ok()
        .and_then(|v| v.as_f64())
}

/// Last price with the key preference used across NSE response shapes:
/// `lastPrice`, then `underlyingValue`, then `underlyingInfo.lastPrice`
fn extract_last_price(payload: &Value) -> Option<f64> {
    if let Some(v) = payload.get("lastPrice").and_then(numeric) {
        return Some(v);
    }
    if let Some(v) = payload.get("underlyingValue").and_then(numeric) {
        return Some(v);
    }
    payload
        .get("underlyingInfo")
        .and_then(|info| info.get("lastPrice"))
        .and_then(numeric)
}

/// Upstream timestamp with the common key preference, local clock fallback
fn extract_timestamp(payload: &Value) -> String {
    for key in ["secDate", "fut_timestamp", "opt_timestamp", "timestamp"] {
        if let Some(ts) = payload.get(key).and_then(Value::as_str) {
            return ts.to_string();
        }
    }
    if let Some(ts) = payload
        .get("metadata")
        .and_then(|m| m.get("lastUpdateTime"))
        .and_then(Value::as_str)
    {
        return ts.to_string();
    }
    local_timestamp()
}

/// Build a quote from an index-shaped payload
fn index_quote(symbol: &str, payload: &Value) -> Result<Quote> {
    let price = extract_last_price(payload).ok_or_else(|| {
        AppError::Schema(format!(
            "No lastPrice or underlyingValue in NSE quote for {}",
            symbol
        ))
    })?;

    let mut quote = Quote::new(symbol, price, extract_timestamp(payload));
    quote.percent_change = payload
        .get("pChange")
        .or_else(|| payload.get("pChangeInPercent"))
        .and_then(numeric)
        .unwrap_or(0.0);
    quote.change = payload.get("change").and_then(numeric).unwrap_or(0.0);
    Ok(quote)
}

/// Build a quote from a stock-shaped payload (`info` + `priceInfo`)
fn stock_quote(symbol: &str, payload: &Value) -> Result<Quote> {
    let info = payload.get("info");
    let price_info = payload
        .get("priceInfo")
        .ok_or_else(|| AppError::NotFound(format!("No data for stock {}", symbol)))?;

    let price = price_info
        .get("lastPrice")
        .and_then(numeric)
        .ok_or_else(|| AppError::Schema(format!("No lastPrice for stock {}", symbol)))?;

    let mut quote = Quote::new(symbol, price, extract_timestamp(payload));
    quote.company_name = info
        .and_then(|i| i.get("companyName"))
        .and_then(Value::as_str)
        .map(String::from);
    quote.percent_change = price_info
        .get("pChange")
        .and_then(numeric)
        .unwrap_or(0.0);
    quote.change = price_info.get("change").and_then(numeric).unwrap_or(0.0);
    quote.open = price_info.get("open").and_then(numeric);
    quote.high = price_info
        .get("intraDayHighLow")
        .and_then(|h| h.get("max"))
        .and_then(numeric);
    quote.low = price_info
        .get("intraDayHighLow")
        .and_then(|h| h.get("min"))
        .and_then(numeric);
    Ok(quote)
}

#[async_trait]
impl Provider for NseProvider {
    fn id(&self) -> &'static str {
        "nse"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let payload = self
            .get_json("/api/quote-equity", &[("symbol", symbol.as_str())])
            .await?;

        // stock responses nest under priceInfo; index responses are flat
        if payload.get("priceInfo").is_some() {
            stock_quote(&symbol, &payload)
        } else {
            index_quote(&symbol, &payload)
        }
    }

    async fn get_option_chain(&self, index: &str) -> Result<OptionChainRaw> {
        let index = index.to_uppercase();
        let payload = self
            .get_json("/api/option-chain-indices", &[("symbol", index.as_str())])
            .await?;
        let chain: OptionChainRaw = serde_json::from_value(payload)?;
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_quote_prefers_last_price() {
        let payload = serde_json::json!({
            "lastPrice": "24,875.55",
            "underlyingValue": 99999.0,
            "pChange": 0.42,
            "change": 104.1,
            "secDate": "16-Sep-2025 15:30:00"
        });

        let quote = index_quote("NIFTY", &payload).unwrap();
        assert_eq!(quote.price, 24875.55);
        assert_eq!(quote.percent_change, 0.42);
        assert_eq!(quote.timestamp, "16-Sep-2025 15:30:00");
    }

    #[test]
    fn test_index_quote_falls_back_to_underlying_value() {
        let payload = serde_json::json!({"underlyingValue": 24875.0});
        let quote = index_quote("NIFTY", &payload).unwrap();
        assert_eq!(quote.price, 24875.0);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.percent_change, 0.0);
    }

    #[test]
    fn test_index_quote_nested_underlying_info() {
        let payload = serde_json::json!({
            "underlyingInfo": {"lastPrice": 51234.5}
        });
        assert_eq!(index_quote("SENSEX", &payload).unwrap().price, 51234.5);
    }

    #[test]
    fn test_index_quote_missing_price_is_schema_error() {
        let payload = serde_json::json!({"pChange": 0.1});
        assert!(matches!(
            index_quote("NIFTY", &payload),
            Err(AppError::Schema(_))
        ));
    }

    #[test]
    fn test_stock_quote_shape() {
        let payload = serde_json::json!({
            "info": {"symbol": "RELIANCE", "companyName": "Reliance Industries Limited"},
            "priceInfo": {
                "lastPrice": "2,950.10",
                "pChange": -0.3,
                "change": -8.9,
                "open": 2960.0,
                "intraDayHighLow": {"min": 2941.0, "max": 2971.2}
            },
            "metadata": {"lastUpdateTime": "16-Sep-2025 15:30:00"}
        });

        let quote = stock_quote("RELIANCE", &payload).unwrap();
        assert_eq!(quote.price, 2950.10);
        assert_eq!(
            quote.company_name.as_deref(),
            Some("Reliance Industries Limited")
        );
        assert_eq!(quote.high, Some(2971.2));
        assert_eq!(quote.timestamp, "16-Sep-2025 15:30:00");
    }
}
