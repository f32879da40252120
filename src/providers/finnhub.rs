//! Finnhub quote adapter
//!
//! Optional equities provider selected via `PROVIDER=FINNHUB`. Requires
//! `FINNHUB_API_KEY`; without it every call degrades to a permanent error.

use crate::error::{classify_status, AppError, Result};
use crate::providers::types::Quote;
use crate::providers::{local_timestamp, Provider};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://finnhub.io/api/v1";

pub struct FinnhubProvider {
    client: Client,
    api_key: Option<String>,
}

impl FinnhubProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Permanent("FINNHUB_API_KEY is not configured".to_string()))
    }
}

/// `/quote` payload: c = current, d = change, dp = percent change,
/// pc = previous close, t = epoch seconds
#[derive(Deserialize)]
struct FinnhubQuote {
    #[serde(default)]
    c: f64,
    #[serde(default)]
    d: Option<f64>,
    #[serde(default)]
    dp: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    o: Option<f64>,
    #[serde(default)]
    t: i64,
}

fn quote_from_payload(symbol: &str, payload: &FinnhubQuote) -> Result<Quote> {
    // Finnhub answers unknown symbols with an all-zero payload
    if payload.c == 0.0 && payload.t == 0 {
        return Err(AppError::NotFound(format!("Unknown symbol: {}", symbol)));
    }

    let timestamp = DateTime::<Utc>::from_timestamp(payload.t, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(local_timestamp);

    let mut quote = Quote::new(symbol, payload.c, timestamp);
    quote.change = payload.d.unwrap_or(0.0);
    quote.percent_change = payload.dp.unwrap_or(0.0);
    quote.open = payload.o;
    quote.high = payload.h;
    quote.low = payload.l;
    Ok(quote)
}

#[async_trait]
impl Provider for FinnhubProvider {
    fn id(&self) -> &'static str {
        "finnhub"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let token = self.key()?;
        let symbol = symbol.to_uppercase();

        let response = self
            .client
            .get(format!("{}/quote", BASE_URL))
            .query(&[("symbol", symbol.as_str()), ("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                format!("Finnhub quote for {} failed with {}", symbol, status),
            ));
        }

        let payload: FinnhubQuote = response.json().await?;
        quote_from_payload(&symbol, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_permanent() {
        let provider = FinnhubProvider::new(None);
        let err = provider.get_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, AppError::Permanent(_)));
    }

    #[test]
    fn test_quote_from_payload() {
        let payload: FinnhubQuote = serde_json::from_value(serde_json::json!({
            "c": 227.5, "d": 1.2, "dp": 0.53, "h": 228.1, "l": 225.0,
            "o": 226.0, "pc": 226.3, "t": 1758016800i64
        }))
        .unwrap();

        let quote = quote_from_payload("AAPL", &payload).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 227.5);
        assert_eq!(quote.change, 1.2);
        assert_eq!(quote.timestamp, "2025-09-16T10:00:00Z");
    }

    #[test]
    fn test_all_zero_payload_is_not_found() {
        let payload: FinnhubQuote =
            serde_json::from_value(serde_json::json!({"c": 0.0, "t": 0})).unwrap();
        assert!(matches!(
            quote_from_payload("ZZZZ", &payload),
            Err(AppError::NotFound(_))
        ));
    }
}
