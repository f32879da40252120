//! Upstream provider adapters
//!
//! One adapter per upstream. Each normalizes symbols, prices and
//! timestamps into the shared [`types::Quote`] record and classifies
//! failures into the application error taxonomy.

pub mod types;

pub mod alphavantage;
pub mod binance;
pub mod finnhub;
pub mod forex;
pub mod nse;
pub mod yahoo;

use crate::config::Config;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use types::{DailyStats, HistoricalBar, OptionChainRaw, Quote};

/// Capability set every adapter draws from
///
/// Adapters implement the subset their upstream supports; the defaults
/// surface the rest as `NotImplemented`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Adapter id (e.g. "yahoo", "binance")
    fn id(&self) -> &'static str;

    /// Latest quote for a symbol
    async fn get_quote(&self, symbol: &str) -> Result<Quote>;

    /// Historical OHLCV bars, time-ascending
    async fn get_historical(
        &self,
        _symbol: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<Vec<HistoricalBar>> {
        Err(AppError::NotImplemented(format!(
            "{} does not serve historical data",
            self.id()
        )))
    }

    /// Raw option chain for an index (exchange adapter only)
    async fn get_option_chain(&self, _index: &str) -> Result<OptionChainRaw> {
        Err(AppError::NotImplemented(format!(
            "{} does not serve option chains",
            self.id()
        )))
    }

    /// Rolling 24-hour statistics (crypto adapter only)
    async fn get_24h_stats(&self, _symbol: &str) -> Result<DailyStats> {
        Err(AppError::NotImplemented(format!(
            "{} does not serve 24h statistics",
            self.id()
        )))
    }

    /// Batch quotes; adapters with a batch endpoint override this
    async fn get_multi_quote(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let mut quotes = HashMap::new();
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(q) => {
                    quotes.insert(q.symbol.clone(), q);
                }
                Err(AppError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(quotes)
    }
}

/// Build the equities adapter named by the `PROVIDER` selector
pub fn equities_provider(config: &Config) -> Arc<dyn Provider> {
    match config.provider.as_str() {
        "FINNHUB" => Arc::new(finnhub::FinnhubProvider::new(
            config.finnhub_api_key.clone(),
        )),
        "ALPHAVANTAGE" => Arc::new(alphavantage::AlphaVantageProvider::new(
            config.alphavantage_api_key.clone(),
        )),
        _ => Arc::new(yahoo::YahooProvider::new()),
    }
}

/// Current wall clock as the ISO-8601 UTC fallback timestamp
pub(crate) fn local_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
