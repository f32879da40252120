//! Yahoo Finance chart-API adapter
//!
//! Default equities upstream. Also serves indices (`^NSEI`, `^BSESN`, ...)
//! and forex pairs (`EURUSD=X`) through the same chart endpoint.

use crate::error::{classify_status, AppError, Result};
use crate::providers::types::{HistoricalBar, Quote};
use crate::providers::{local_timestamp, Provider};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str, interval: &str) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", BASE_URL, symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Unknown symbol: {}", symbol)));
        }
        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                format!("Chart request for {} failed with {}", symbol, status),
            ));
        }

        let envelope: ChartEnvelope = response.json().await?;
        let chart = envelope
            .chart
            .ok_or_else(|| AppError::Schema("Chart payload missing 'chart'".to_string()))?;

        if let Some(err) = chart.error {
            return Err(AppError::NotFound(format!(
                "{}: {}",
                symbol,
                err.description.unwrap_or_else(|| "no data".to_string())
            )));
        }

        chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| AppError::NotFound(format!("No chart data for {}", symbol)))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for YahooProvider {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = symbol.to_uppercase();
        let result = self.fetch_chart(&symbol, "1d", "1m").await?;
        let quote = quote_from_chart(&symbol, &result)?;
        debug!("yahoo quote {} @ {}", quote.symbol, quote.price);
        Ok(quote)
    }

    async fn get_historical(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<HistoricalBar>> {
        let symbol = symbol.to_uppercase();
        let result = self.fetch_chart(&symbol, period, interval).await?;
        let bars = bars_from_chart(&result);
        if bars.is_empty() {
            return Err(AppError::NotFound(format!(
                "No historical data for {}",
                symbol
            )));
        }
        Ok(bars)
    }
}

// Chart API response structures
#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Option<Chart>,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    #[allow(dead_code)]
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
    #[serde(rename = "regularMarketTime")]
    regular_market_time: Option<i64>,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "regularMarketDayHigh")]
    day_high: Option<f64>,
    #[serde(rename = "regularMarketDayLow")]
    day_low: Option<f64>,
    #[serde(rename = "regularMarketVolume")]
    market_volume: Option<i64>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<IndicatorQuote>,
}

#[derive(Deserialize, Default)]
struct IndicatorQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn quote_from_chart(symbol: &str, result: &ChartResult) -> Result<Quote> {
    let meta = &result.meta;
    let price = match meta.regular_market_price {
        Some(p) if p > 0.0 => p,
        _ => {
            // fall back to the last non-null minute close
            last_close(result).ok_or_else(|| {
                AppError::Schema(format!("No price in chart payload for {}", symbol))
            })?
        }
    };

    let (change, percent_change) = match meta.chart_previous_close {
        Some(prev) if prev > 0.0 => (price - prev, (price - prev) / prev * 100.0),
        _ => (0.0, 0.0),
    };

    let timestamp = meta
        .regular_market_time
        .and_then(epoch_to_iso)
        .unwrap_or_else(local_timestamp);

    let mut quote = Quote::new(symbol, price, timestamp);
    quote.company_name = meta.long_name.clone();
    quote.change = change;
    quote.percent_change = percent_change;
    quote.high = meta.day_high;
    quote.low = meta.day_low;
    quote.volume = meta.market_volume;
    Ok(quote)
}

/// Most recent non-null minute close in the quote series
fn last_close(result: &ChartResult) -> Option<f64> {
    result
        .indicators
        .as_ref()?
        .quote
        .first()?
        .close
        .iter()
        .rev()
        .find_map(|c| *c)
}

fn bars_from_chart(result: &ChartResult) -> Vec<HistoricalBar> {
    let Some(indicators) = &result.indicators else {
        return Vec::new();
    };
    let Some(ohlcv) = indicators.quote.first() else {
        return Vec::new();
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, epoch) in result.timestamp.iter().enumerate() {
        // rows with a null close are placeholder minutes; skip them
        let Some(close) = ohlcv.close.get(i).copied().flatten() else {
            continue;
        };
        let Some(timestamp) = epoch_to_iso(*epoch) else {
            continue;
        };
        bars.push(HistoricalBar {
            timestamp,
            open: ohlcv.open.get(i).copied().flatten().unwrap_or(close),
            high: ohlcv.high.get(i).copied().flatten().unwrap_or(close),
            low: ohlcv.low.get(i).copied().flatten().unwrap_or(close),
            close,
            volume: ohlcv.volume.get(i).copied().flatten().unwrap_or(0.0),
        });
    }
    bars
}

fn epoch_to_iso(epoch: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ChartResult {
        serde_json::from_value(serde_json::json!({
            "meta": {
                "regularMarketPrice": 1510.5,
                "chartPreviousClose": 1500.0,
                "regularMarketTime": 1758016800,
                "longName": "Infosys Limited"
            },
            "timestamp": [1758016740, 1758016800],
            "indicators": {
                "quote": [{
                    "open": [1509.0, null],
                    "high": [1511.0, null],
                    "low": [1508.5, null],
                    "close": [1510.0, null],
                    "volume": [12000.0, null]
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_quote_from_chart() {
        let quote = quote_from_chart("INFY.NS", &sample_result()).unwrap();
        assert_eq!(quote.symbol, "INFY.NS");
        assert_eq!(quote.price, 1510.5);
        assert!((quote.change - 10.5).abs() < 1e-9);
        assert!((quote.percent_change - 0.7).abs() < 1e-9);
        assert_eq!(quote.company_name.as_deref(), Some("Infosys Limited"));
        assert_eq!(quote.timestamp, "2025-09-16T10:00:00Z");
    }

    #[test]
    fn test_bars_skip_null_closes() {
        let bars = bars_from_chart(&sample_result());
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1510.0);
        assert_eq!(bars[0].volume, 12000.0);
    }

    #[test]
    fn test_quote_falls_back_to_last_close() {
        let result: ChartResult = serde_json::from_value(serde_json::json!({
            "meta": {},
            "timestamp": [1758016740],
            "indicators": {"quote": [{"close": [42.0]}]}
        }))
        .unwrap();

        let quote = quote_from_chart("XYZ", &result).unwrap();
        assert_eq!(quote.price, 42.0);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.percent_change, 0.0);
    }
}
