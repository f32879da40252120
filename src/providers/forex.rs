//! Forex adapter
//!
//! Currency pairs are quoted through the Yahoo chart upstream with the
//! `=X` suffix convention (`EURUSD` -> `EURUSD=X`). Only pairs in the
//! configured table are accepted; anything else is NotFound.

use crate::error::{AppError, Result};
use crate::providers::types::{HistoricalBar, Quote};
use crate::providers::yahoo::YahooProvider;
use crate::providers::Provider;
use async_trait::async_trait;

/// Supported pairs: (symbol, base currency, quote currency)
pub const FOREX_PAIRS: &[(&str, &str, &str)] = &[
    ("EURUSD", "EUR", "USD"),
    ("GBPUSD", "GBP", "USD"),
    ("USDJPY", "USD", "JPY"),
    ("USDCHF", "USD", "CHF"),
    ("AUDUSD", "AUD", "USD"),
    ("USDCAD", "USD", "CAD"),
    ("NZDUSD", "NZD", "USD"),
    ("EURJPY", "EUR", "JPY"),
    ("GBPJPY", "GBP", "JPY"),
    ("EURGBP", "EUR", "GBP"),
    ("EURCHF", "EUR", "CHF"),
    ("GBPCHF", "GBP", "CHF"),
    ("AUDJPY", "AUD", "JPY"),
    ("CADJPY", "CAD", "JPY"),
    ("CHFJPY", "CHF", "JPY"),
    ("NZDJPY", "NZD", "JPY"),
    ("EURAUD", "EUR", "AUD"),
    ("GBPAUD", "GBP", "AUD"),
    ("AUDCHF", "AUD", "CHF"),
    ("AUDCAD", "AUD", "CAD"),
    ("AUDNZD", "AUD", "NZD"),
    ("USDSGD", "USD", "SGD"),
    ("USDHKD", "USD", "HKD"),
    ("USDINR", "USD", "INR"),
    ("USDCNY", "USD", "CNY"),
    ("USDZAR", "USD", "ZAR"),
    ("USDMXN", "USD", "MXN"),
    ("USDTRY", "USD", "TRY"),
];

pub fn is_known_pair(symbol: &str) -> bool {
    FOREX_PAIRS.iter().any(|(pair, _, _)| *pair == symbol)
}

/// Yahoo-backed forex quotes restricted to the configured pair table
pub struct ForexProvider {
    upstream: YahooProvider,
}

impl ForexProvider {
    pub fn new() -> Self {
        Self {
            upstream: YahooProvider::new(),
        }
    }

    fn upstream_symbol(symbol: &str) -> Result<String> {
        let symbol = symbol.to_uppercase();
        if !is_known_pair(&symbol) {
            return Err(AppError::NotFound(format!(
                "Unknown forex pair: {}",
                symbol
            )));
        }
        Ok(format!("{}=X", symbol))
    }
}

impl Default for ForexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ForexProvider {
    fn id(&self) -> &'static str {
        "forex"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let mapped = Self::upstream_symbol(symbol)?;
        let mut quote = self.upstream.get_quote(&mapped).await?;
        quote.symbol = symbol.to_uppercase();
        Ok(quote)
    }

    async fn get_historical(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<HistoricalBar>> {
        let mapped = Self::upstream_symbol(symbol)?;
        self.upstream.get_historical(&mapped, period, interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        assert!(is_known_pair("EURUSD"));
        assert!(is_known_pair("USDINR"));
        assert!(!is_known_pair("EURXYZ"));
    }

    #[test]
    fn test_upstream_symbol_mapping() {
        assert_eq!(
            ForexProvider::upstream_symbol("eurusd").unwrap(),
            "EURUSD=X"
        );
        assert!(matches!(
            ForexProvider::upstream_symbol("ZZZAAA"),
            Err(AppError::NotFound(_))
        ));
    }
}
