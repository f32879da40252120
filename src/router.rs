//! Symbol classification and provider routing
//!
//! Deterministic, stateless classification by pattern, with precedence:
//! crypto token substring, local-exchange suffix, forex pair table, named
//! index, option contract, foreign-equity fallback. Adapters and token
//! lists are injected at construction.

use crate::providers::forex;
use crate::providers::Provider;
use std::sync::Arc;

/// Derived class of a symbol; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    EquityLocal,
    EquityForeign,
    CryptoSpot,
    ForexPair,
    Index,
    OptionContract,
}

/// Named index symbols served by the exchange adapter's venue
const INDEX_SYMBOLS: &[&str] = &[
    "NIFTY",
    "BANKNIFTY",
    "FINNIFTY",
    "MIDCPNIFTY",
    "SENSEX",
    "BANKEX",
];

/// Yahoo tickers for the named indices
fn index_upstream_symbol(symbol: &str) -> &'static str {
    match symbol {
        "NIFTY" => "^NSEI",
        "BANKNIFTY" => "^NSEBANK",
        "FINNIFTY" => "NIFTY_FIN_SERVICE.NS",
        "MIDCPNIFTY" => "NIFTY_MID_SELECT.NS",
        "SENSEX" => "^BSESN",
        "BANKEX" => "^BSEBANK",
        _ => "^NSEI",
    }
}

/// Resolved route for a symbol
pub struct Route {
    pub class: SymbolClass,
    pub provider: Arc<dyn Provider>,
    /// Symbol as the chosen upstream spells it
    pub upstream_symbol: String,
}

/// Classifies symbols and hands back the adapter to use
pub struct SymbolRouter {
    equities: Arc<dyn Provider>,
    crypto: Arc<dyn Provider>,
    forex: Arc<dyn Provider>,
    exchange: Arc<dyn Provider>,
    crypto_tokens: Vec<String>,
}

impl SymbolRouter {
    pub fn new(
        equities: Arc<dyn Provider>,
        crypto: Arc<dyn Provider>,
        forex: Arc<dyn Provider>,
        exchange: Arc<dyn Provider>,
        crypto_tokens: Vec<String>,
    ) -> Self {
        Self {
            equities,
            crypto,
            forex,
            exchange,
            crypto_tokens,
        }
    }

    /// Classify a symbol; precedence is top-down and the first match wins
    pub fn classify(&self, symbol: &str) -> SymbolClass {
        let symbol = symbol.trim().to_uppercase();

        if self.crypto_tokens.iter().any(|t| symbol.contains(t.as_str())) {
            return SymbolClass::CryptoSpot;
        }
        if symbol.ends_with(".NS") || symbol.ends_with(".BO") {
            return SymbolClass::EquityLocal;
        }
        if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic())
            && forex::is_known_pair(&symbol)
        {
            return SymbolClass::ForexPair;
        }
        if INDEX_SYMBOLS.contains(&symbol.as_str()) {
            return SymbolClass::Index;
        }
        if is_option_contract(&symbol) {
            return SymbolClass::OptionContract;
        }
        SymbolClass::EquityForeign
    }

    /// Adapter handle plus the upstream spelling for a symbol
    pub fn route(&self, symbol: &str) -> Route {
        let canonical = symbol.trim().to_uppercase();
        let class = self.classify(&canonical);
        let (provider, upstream_symbol) = match class {
            SymbolClass::CryptoSpot => (self.crypto.clone(), canonical),
            SymbolClass::ForexPair => (self.forex.clone(), canonical),
            SymbolClass::Index => (
                self.equities.clone(),
                index_upstream_symbol(&canonical).to_string(),
            ),
            SymbolClass::OptionContract => (self.exchange.clone(), canonical),
            SymbolClass::EquityLocal | SymbolClass::EquityForeign => {
                (self.equities.clone(), canonical)
            }
        };
        Route {
            class,
            provider,
            upstream_symbol,
        }
    }

    /// The exchange (option chain) adapter
    pub fn exchange(&self) -> Arc<dyn Provider> {
        self.exchange.clone()
    }

    /// The crypto adapter
    pub fn crypto(&self) -> Arc<dyn Provider> {
        self.crypto.clone()
    }
}

/// Derivative contract symbols end in CE/PE after a strike component
fn is_option_contract(symbol: &str) -> bool {
    (symbol.ends_with("CE") || symbol.ends_with("PE"))
        && symbol.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::providers::types::Quote;
    use async_trait::async_trait;

    struct StubProvider(&'static str);

    #[async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &'static str {
            self.0
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote> {
            Ok(Quote::new(symbol, 1.0, "t".to_string()))
        }
    }

    fn router() -> SymbolRouter {
        SymbolRouter::new(
            Arc::new(StubProvider("equities")),
            Arc::new(StubProvider("crypto")),
            Arc::new(StubProvider("forex")),
            Arc::new(StubProvider("exchange")),
            vec![
                "USDT".to_string(),
                "BTC".to_string(),
                "ETH".to_string(),
            ],
        )
    }

    #[test]
    fn test_crypto_routing() {
        let r = router();
        assert_eq!(r.classify("BTCUSDT"), SymbolClass::CryptoSpot);
        assert_eq!(r.classify("ethusdt"), SymbolClass::CryptoSpot);
        assert_eq!(r.route("BTCUSDT").provider.id(), "crypto");
        assert_eq!(r.route("BTCUSDT").upstream_symbol, "BTCUSDT");
    }

    #[test]
    fn test_local_equity_routing() {
        let r = router();
        assert_eq!(r.classify("INFY.NS"), SymbolClass::EquityLocal);
        assert_eq!(r.classify("RELIANCE.BO"), SymbolClass::EquityLocal);
        assert_eq!(r.route("infy.ns").provider.id(), "equities");
        assert_eq!(r.route("infy.ns").upstream_symbol, "INFY.NS");
    }

    #[test]
    fn test_forex_routing() {
        let r = router();
        assert_eq!(r.classify("EURUSD"), SymbolClass::ForexPair);
        assert_eq!(r.classify("USDCAD"), SymbolClass::ForexPair);
        assert_eq!(r.route("EURUSD").provider.id(), "forex");
        // six letters but not a configured pair
        assert_eq!(r.classify("ABCDEF"), SymbolClass::EquityForeign);
    }

    #[test]
    fn test_index_routing_with_mapping() {
        let r = router();
        assert_eq!(r.classify("NIFTY"), SymbolClass::Index);
        let route = r.route("NIFTY");
        assert_eq!(route.provider.id(), "equities");
        assert_eq!(route.upstream_symbol, "^NSEI");
        assert_eq!(r.route("SENSEX").upstream_symbol, "^BSESN");
    }

    #[test]
    fn test_option_contract_routing() {
        let r = router();
        assert_eq!(
            r.classify("NIFTY16SEP2524800CE"),
            SymbolClass::OptionContract
        );
        assert_eq!(r.route("NIFTY16SEP2524800CE").provider.id(), "exchange");
    }

    #[test]
    fn test_foreign_equity_fallback() {
        let r = router();
        assert_eq!(r.classify("AAPL"), SymbolClass::EquityForeign);
        assert_eq!(r.route("AAPL").provider.id(), "equities");
    }

    #[test]
    fn test_precedence_crypto_wins() {
        // contains a crypto token and ends like an option contract;
        // crypto is first in precedence
        let r = router();
        assert_eq!(r.classify("BTC123CE"), SymbolClass::CryptoSpot);
    }
}
