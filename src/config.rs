//! Environment-derived service configuration
//!
//! All knobs are read once at startup and carried inside `AppState`;
//! nothing reads the environment after construction.

use std::env;
use std::path::PathBuf;

/// Default subscription list when no document exists and no env override is set
const DEFAULT_SYMBOLS: &str = "RELIANCE.NS,INFY.NS";

/// Crypto token substrings used by the symbol router. USDC is deliberately
/// not in the default set: USDCAD and USDCHF would match it.
const DEFAULT_CRYPTO_TOKENS: &str = "USDT,BTC,ETH,BNB,SOL,XRP,DOGE";

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host for the HTTP server
    pub host: String,
    /// Bind port for the HTTP server
    pub port: u16,
    /// Seconds between polling passes
    pub fetch_interval: u64,
    /// Default equities adapter selector (YAHOO, FINNHUB, ALPHAVANTAGE)
    pub provider: String,
    /// Fallback subscription list when the JSON document is absent
    pub default_symbols: Vec<String>,
    /// Path of the persisted subscription document
    pub subscriptions_file: PathBuf,
    /// Directory receiving option-chain snapshots
    pub snapshot_dir: PathBuf,
    /// Token substrings that classify a symbol as crypto spot
    pub crypto_tokens: Vec<String>,
    pub finnhub_api_key: Option<String>,
    pub alphavantage_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let fetch_interval = env::var("FETCH_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let provider = env::var("PROVIDER")
            .unwrap_or_else(|_| "YAHOO".to_string())
            .to_uppercase();

        let default_symbols = split_list(
            &env::var("FETCH_SYMBOLS").unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string()),
        );

        let subscriptions_file = env::var("SUBSCRIPTIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("subscriptions.json"));

        let snapshot_dir = env::var("OPTION_CHAIN_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("option_chain_data"));

        let crypto_tokens = split_list(
            &env::var("CRYPTO_TOKENS").unwrap_or_else(|_| DEFAULT_CRYPTO_TOKENS.to_string()),
        );

        Self {
            host,
            port,
            fetch_interval,
            provider,
            default_symbols,
            subscriptions_file,
            snapshot_dir,
            crypto_tokens,
            finnhub_api_key: env::var("FINNHUB_API_KEY").ok(),
            alphavantage_api_key: env::var("ALPHAVANTAGE_API_KEY").ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            fetch_interval: 60,
            provider: "YAHOO".to_string(),
            default_symbols: split_list(DEFAULT_SYMBOLS),
            subscriptions_file: PathBuf::from("subscriptions.json"),
            snapshot_dir: PathBuf::from("option_chain_data"),
            crypto_tokens: split_list(DEFAULT_CRYPTO_TOKENS),
            finnhub_api_key: None,
            alphavantage_api_key: None,
        }
    }
}

/// Split a comma-separated list, trimming blanks and upper-casing entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
