//! Binance spot adapter
//!
//! Crypto quotes via `/api/v3/ticker/price` (single and batch), klines via
//! `/api/v3/klines`, rolling statistics via `/api/v3/ticker/24hr`. All
//! numeric fields arrive as strings.

use crate::error::{classify_status, AppError, Result};
use crate::providers::types::{DailyStats, HistoricalBar, Quote, StringOrFloat};
use crate::providers::{local_timestamp, Provider};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.binance.com";

/// Binance "invalid symbol" error code
const INVALID_SYMBOL: i64 = -1121;

pub struct BinanceProvider {
    client: Client,
}

impl BinanceProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Turn an error payload into the matching error kind
    async fn classify_error(symbol: &str, response: reqwest::Response) -> AppError {
        let status = response.status().as_u16();
        let body: Option<BinanceError> = response.json().await.ok();
        match body {
            Some(err) if err.code == INVALID_SYMBOL => {
                AppError::NotFound(format!("Unknown symbol: {}", symbol))
            }
            Some(err) => classify_status(status, format!("Binance: {}", err.msg)),
            None => classify_status(status, format!("Binance request for {} failed", symbol)),
        }
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct BinanceError {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
struct TickerPrice {
    symbol: String,
    price: StringOrFloat,
}

#[derive(Deserialize)]
struct Ticker24h {
    symbol: String,
    #[serde(rename = "lastPrice", default)]
    last_price: StringOrFloat,
    #[serde(rename = "priceChange", default)]
    price_change: StringOrFloat,
    #[serde(rename = "priceChangePercent", default)]
    price_change_percent: StringOrFloat,
    #[serde(rename = "openPrice", default)]
    open_price: StringOrFloat,
    #[serde(rename = "highPrice", default)]
    high_price: StringOrFloat,
    #[serde(rename = "lowPrice", default)]
    low_price: StringOrFloat,
    #[serde(default)]
    volume: StringOrFloat,
    #[serde(rename = "quoteVolume", default)]
    quote_volume: StringOrFloat,
}

fn quote_from_ticker(ticker: &TickerPrice) -> Result<Quote> {
    let price = ticker.price.as_f64().ok_or_else(|| {
        AppError::Schema(format!("Unparseable price for {}", ticker.symbol))
    })?;
    Ok(Quote::new(&ticker.symbol, price, local_timestamp()))
}

/// Parse one positional kline row:
/// `[openTime, open, high, low, close, volume, closeTime, ...]`
fn parse_kline(row: &[Value]) -> Result<HistoricalBar> {
    fn num(row: &[Value], idx: usize) -> Result<f64> {
        let field: StringOrFloat = row
            .get(idx)
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        field
            .as_f64()
            .ok_or_else(|| AppError::Schema(format!("Kline field {} is not numeric", idx)))
    }

    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Schema("Kline row missing open time".to_string()))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| AppError::Schema("Kline open time out of range".to_string()))?;

    Ok(HistoricalBar {
        timestamp,
        open: num(row, 1)?,
        high: num(row, 2)?,
        low: num(row, 3)?,
        close: num(row, 4)?,
        volume: num(row, 5)?,
    })
}

#[async_trait]
impl Provider for BinanceProvider {
    fn id(&self) -> &'static str {
        "binance"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let response = self
            .client
            .get(format!("{}/api/v3/ticker/price", BASE_URL))
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(&symbol, response).await);
        }

        let ticker: TickerPrice = response.json().await?;
        quote_from_ticker(&ticker)
    }

    async fn get_historical(
        &self,
        symbol: &str,
        _period: &str,
        interval: &str,
    ) -> Result<Vec<HistoricalBar>> {
        let symbol = symbol.to_uppercase();
        let response = self
            .client
            .get(format!("{}/api/v3/klines", BASE_URL))
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", interval),
                ("limit", "100"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(&symbol, response).await);
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn get_24h_stats(&self, symbol: &str) -> Result<DailyStats> {
        let symbol = symbol.to_uppercase();
        let response = self
            .client
            .get(format!("{}/api/v3/ticker/24hr", BASE_URL))
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(&symbol, response).await);
        }

        let stats: Ticker24h = response.json().await?;
        let last_price = stats.last_price.as_f64().ok_or_else(|| {
            AppError::Schema(format!("Unparseable last price for {}", symbol))
        })?;

        Ok(DailyStats {
            symbol: stats.symbol,
            last_price,
            price_change: stats.price_change.to_f64(),
            price_change_percent: stats.price_change_percent.to_f64(),
            open: stats.open_price.to_f64(),
            high: stats.high_price.to_f64(),
            low: stats.low_price.to_f64(),
            volume: stats.volume.to_f64(),
            quote_volume: stats.quote_volume.to_f64(),
        })
    }

    async fn get_multi_quote(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        // /ticker/price accepts symbols=["A","B"] as a JSON-array query value
        let listed = symbols
            .iter()
            .map(|s| format!("\"{}\"", s.to_uppercase()))
            .collect::<Vec<_>>()
            .join(",");
        let response = self
            .client
            .get(format!("{}/api/v3/ticker/price", BASE_URL))
            .query(&[("symbols", format!("[{}]", listed))])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(&listed, response).await);
        }

        let tickers: Vec<TickerPrice> = response.json().await?;
        let mut quotes = HashMap::new();
        for ticker in &tickers {
            let quote = quote_from_ticker(ticker)?;
            quotes.insert(quote.symbol.clone(), quote);
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kline_row() {
        let row: Vec<Value> = serde_json::from_value(serde_json::json!([
            1758016800000i64,
            "64950.01",
            "65100.00",
            "64900.00",
            "65000.50",
            "123.456",
            1758016859999i64,
            "8021345.11",
            420,
            "60.0",
            "3900000.0",
            "0"
        ]))
        .unwrap();

        let bar = parse_kline(&row).unwrap();
        assert_eq!(bar.timestamp, "2025-09-16T10:00:00Z");
        assert_eq!(bar.open, 64950.01);
        assert_eq!(bar.close, 65000.50);
        assert_eq!(bar.volume, 123.456);
    }

    #[test]
    fn test_parse_kline_rejects_garbage() {
        let row: Vec<Value> =
            serde_json::from_value(serde_json::json!([1758016800000i64, "not-a-price"])).unwrap();
        assert!(matches!(parse_kline(&row), Err(AppError::Schema(_))));
    }

    #[test]
    fn test_quote_from_ticker_string_price() {
        let ticker: TickerPrice = serde_json::from_value(serde_json::json!({
            "symbol": "BTCUSDT",
            "price": "65000.50"
        }))
        .unwrap();

        let quote = quote_from_ticker(&ticker).unwrap();
        assert_eq!(quote.symbol, "BTCUSDT");
        assert_eq!(quote.price, 65000.50);
    }

    #[test]
    fn test_ticker_24h_string_numerics() {
        let stats: Ticker24h = serde_json::from_value(serde_json::json!({
            "symbol": "BTCUSDT",
            "lastPrice": "65000.50",
            "priceChange": "-120.10",
            "priceChangePercent": "-0.18",
            "openPrice": "65120.60",
            "highPrice": "65500.00",
            "lowPrice": "64800.00",
            "volume": "1234.5",
            "quoteVolume": "80123456.7",
            "closeTime": 1758016800000i64
        }))
        .unwrap();

        assert_eq!(stats.last_price.as_f64(), Some(65000.50));
        assert_eq!(stats.price_change.to_f64(), -120.10);
        assert_eq!(stats.quote_volume.to_f64(), 80123456.7);
    }
}
