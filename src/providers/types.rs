//! Shared provider data types
//!
//! The unified quote record every adapter normalizes into, plus the raw
//! upstream shapes that need explicit handling (string-or-number fields,
//! nested option-chain records).

use serde::{Deserialize, Serialize};

/// Unified normalized quote for a single symbol at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// ISO-8601 UTC; upstream-provided when available, else adapter-local
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Zero-filled when the upstream omits it
    #[serde(default)]
    pub percent_change: f64,
    /// Zero-filled when the upstream omits it
    #[serde(default)]
    pub change: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<i64>,
}

impl Quote {
    /// Minimal quote with price and timestamp only
    pub fn new(symbol: &str, price: f64, timestamp: String) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price,
            timestamp,
            company_name: None,
            percent_change: 0.0,
            change: 0.0,
            bid: None,
            ask: None,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }
}

/// One OHLCV bar of a historical series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Rolling 24-hour statistics for a crypto symbol
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    pub symbol: String,
    pub last_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub quote_volume: f64,
}

// ============================================================================
// Option chain upstream shapes
// ============================================================================

/// Raw option-chain document as served by the exchange
///
/// Every field below the top level is optional so that a malformed payload
/// surfaces as a schema error instead of a deserialization panic.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionChainRaw {
    pub records: Option<ChainRecords>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainRecords {
    pub data: Option<Vec<ChainEntry>>,
    #[serde(rename = "expiryDates")]
    pub expiry_dates: Option<Vec<String>>,
    #[serde(rename = "underlyingValue")]
    pub underlying_value: Option<f64>,
}

/// One strike/expiry row of the raw chain with its nested sides
#[derive(Debug, Clone, Deserialize)]
pub struct ChainEntry {
    #[serde(rename = "strikePrice", default)]
    pub strike_price: StringOrFloat,
    #[serde(rename = "expiryDate", default)]
    pub expiry_date: String,
    #[serde(rename = "CE")]
    pub ce: Option<OptionSide>,
    #[serde(rename = "PE")]
    pub pe: Option<OptionSide>,
}

/// Nested CE/PE sub-record of a chain row
#[derive(Debug, Clone, Deserialize)]
pub struct OptionSide {
    #[serde(rename = "openInterest", default)]
    pub open_interest: StringOrFloat,
    #[serde(rename = "changeinOpenInterest", default)]
    pub changein_open_interest: StringOrFloat,
    #[serde(rename = "totalTradedVolume", default)]
    pub total_traded_volume: StringOrFloat,
    #[serde(rename = "impliedVolatility", default)]
    pub implied_volatility: StringOrFloat,
    #[serde(rename = "lastPrice", default)]
    pub last_price: StringOrFloat,
    #[serde(default)]
    pub change: StringOrFloat,
}

// ============================================================================
// Flexible numeric deserialization
// ============================================================================

/// Numeric field that upstreams serve as a number or a string,
/// occasionally with thousands separators
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(untagged)]
pub enum StringOrFloat {
    #[default]
    None,
    Str(String),
    Float(f64),
    Int(i64),
}

impl StringOrFloat {
    /// Parse to f64, stripping thousands separators; None for absent,
    /// unparseable or non-finite values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StringOrFloat::None => None,
            StringOrFloat::Str(s) => s
                .replace(',', "")
                .trim()
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite()),
            StringOrFloat::Float(f) => Some(*f).filter(|v| v.is_finite()),
            StringOrFloat::Int(i) => Some(*i as f64),
        }
    }

    /// Parse to f64 with a zero default for absent or malformed values
    pub fn to_f64(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }
}
