//! In-memory quote cache
//!
//! Latest normalized quote per symbol. No TTL; staleness is the caller's
//! concern via the quote timestamp. Memory is bounded by subscription size.

use crate::providers::types::Quote;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Concurrent map of upper-cased symbol to latest quote
///
/// A single lock over the backing map so `snapshot` returns a consistent
/// point-in-time view with no partial per-symbol updates visible.
#[derive(Default)]
pub struct QuoteCache {
    store: RwLock<HashMap<String, Quote>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any prior entry for the symbol; last writer wins
    pub fn set(&self, symbol: &str, quote: Quote) {
        let key = symbol.to_uppercase();
        let mut store = self.store.write();
        if let Some(prev) = store.get(&key) {
            // out-of-order upstream responses are accepted, just noted
            if quote.timestamp < prev.timestamp {
                debug!(
                    "Out-of-order quote for {}: {} after {}",
                    key, quote.timestamp, prev.timestamp
                );
            }
        }
        store.insert(key, quote);
    }

    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.store.read().get(&symbol.to_uppercase()).cloned()
    }

    /// Stable copy of the whole cache
    pub fn snapshot(&self) -> HashMap<String, Quote> {
        self.store.read().clone()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}
