//! AlphaVantage adapter
//!
//! Optional equities provider selected via `PROVIDER=ALPHAVANTAGE`.
//! Quotes come from the latest intraday 1-minute bar; historical series
//! pick the upstream function by requested interval. The free tier is
//! heavily rate limited, which the API signals inside a 200 response.

use crate::error::{classify_status, AppError, Result};
use crate::providers::types::{HistoricalBar, Quote};
use crate::providers::Provider;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

const BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageProvider {
    client: Client,
    api_key: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Permanent("ALPHAVANTAGE_API_KEY is not configured".to_string())
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self.client.get(BASE_URL).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                format!("AlphaVantage request failed with {}", status),
            ));
        }

        let payload: Value = response.json().await?;
        // rate limiting and bad requests come back as 200s with a note
        if let Some(note) = payload.get("Note").and_then(Value::as_str) {
            return Err(AppError::Transient(format!("AlphaVantage: {}", note)));
        }
        if let Some(info) = payload.get("Information").and_then(Value::as_str) {
            return Err(AppError::Transient(format!("AlphaVantage: {}", info)));
        }
        if let Some(msg) = payload.get("Error Message").and_then(Value::as_str) {
            return Err(AppError::NotFound(format!("AlphaVantage: {}", msg)));
        }
        Ok(payload)
    }
}

/// Map a requested interval to the upstream function and series key
fn series_selector(interval: &str) -> Result<(&'static str, String, Option<String>)> {
    match interval {
        "1m" | "5m" | "15m" | "30m" | "60m" => {
            let av = match interval {
                "1m" => "1min",
                "5m" => "5min",
                "15m" => "15min",
                "30m" => "30min",
                _ => "60min",
            };
            Ok((
                "TIME_SERIES_INTRADAY",
                format!("Time Series ({})", av),
                Some(av.to_string()),
            ))
        }
        "1d" | "5d" => Ok((
            "TIME_SERIES_DAILY",
            "Time Series (Daily)".to_string(),
            None,
        )),
        "1wk" => Ok((
            "TIME_SERIES_WEEKLY",
            "Weekly Time Series".to_string(),
            None,
        )),
        "1mo" => Ok((
            "TIME_SERIES_MONTHLY",
            "Monthly Time Series".to_string(),
            None,
        )),
        other => Err(AppError::Validation(format!(
            "Unsupported interval: {}",
            other
        ))),
    }
}

fn bar_from_entry(timestamp: &str, values: &Value) -> HistoricalBar {
    fn field(values: &Value, key: &str) -> f64 {
        values
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0)
    }

    HistoricalBar {
        timestamp: timestamp.to_string(),
        open: field(values, "1. open"),
        high: field(values, "2. high"),
        low: field(values, "3. low"),
        close: field(values, "4. close"),
        volume: field(values, "5. volume"),
    }
}

#[async_trait]
impl Provider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        "alphavantage"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let key = self.key()?.to_string();
        let symbol = symbol.to_uppercase();

        let payload = self
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol.as_str()),
                ("interval", "1min"),
                ("outputsize", "compact"),
                ("apikey", key.as_str()),
            ])
            .await?;

        let series = payload
            .get("Time Series (1min)")
            .and_then(Value::as_object)
            .ok_or_else(|| AppError::NotFound(format!("No intraday data for {}", symbol)))?;

        let latest = series
            .keys()
            .max()
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No intraday data for {}", symbol)))?;

        let close = series
            .get(&latest)
            .and_then(|v| v.get("4. close"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| {
                AppError::Schema(format!("Missing close in intraday series for {}", symbol))
            })?;

        Ok(Quote::new(&symbol, close, latest))
    }

    async fn get_historical(
        &self,
        symbol: &str,
        _period: &str,
        interval: &str,
    ) -> Result<Vec<HistoricalBar>> {
        let key = self.key()?.to_string();
        let symbol = symbol.to_uppercase();
        let (function, series_key, av_interval) = series_selector(interval)?;

        let mut params: Vec<(&str, &str)> = vec![
            ("function", function),
            ("symbol", symbol.as_str()),
            ("outputsize", "compact"),
            ("apikey", key.as_str()),
        ];
        if let Some(ref av) = av_interval {
            params.push(("interval", av.as_str()));
        }

        let payload = self.query(&params).await?;
        let series: HashMap<String, Value> = payload
            .get(&series_key)
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .ok_or_else(|| AppError::NotFound(format!("No historical data for {}", symbol)))?;

        let mut bars: Vec<HistoricalBar> = series
            .iter()
            .map(|(ts, values)| bar_from_entry(ts, values))
            .collect();
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(bars)
    }
}
