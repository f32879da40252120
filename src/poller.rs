//! Background quote poller
//!
//! One long-lived task that fans the subscription list across the routed
//! adapters every `FETCH_INTERVAL` seconds and writes successes into the
//! cache. One symbol's failure never aborts the pass; a failed symbol is
//! naturally retried on the next tick, so there are no within-pass
//! retries. The cancellation token is observed at every loop boundary.

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delay between per-symbol adapter calls within a pass
const INTER_SYMBOL_DELAY: Duration = Duration::from_millis(200);

pub struct Poller {
    state: Arc<AppState>,
}

impl Poller {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Spawn the polling loop; it exits cleanly when `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(cancel).await;
        })
    }

    async fn run(self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.state.config.fetch_interval);
        info!("Poller started, interval {}s", interval.as_secs());

        while !cancel.is_cancelled() {
            let symbols = self.state.subscriptions.list();
            if symbols.is_empty() {
                if sleep_or_cancel(&cancel, interval).await {
                    break;
                }
                continue;
            }

            if self.pass(&symbols, &cancel).await {
                break;
            }

            if let Err(e) = self.state.subscriptions.save() {
                error!("Save subscriptions error: {}", e);
            }

            if sleep_or_cancel(&cancel, interval).await {
                break;
            }
        }

        info!("Poller stopped");
    }

    /// One pass over the subscription snapshot; returns true on cancellation
    async fn pass(&self, symbols: &[String], cancel: &CancellationToken) -> bool {
        for symbol in symbols {
            if cancel.is_cancelled() {
                return true;
            }

            let route = self.state.router.route(symbol);
            match route.provider.get_quote(&route.upstream_symbol).await {
                Ok(mut quote) => {
                    // cache under the canonical symbol, not the upstream spelling
                    quote.symbol = symbol.clone();
                    self.state.cache.set(symbol, quote);
                }
                Err(e) => {
                    warn!("Fetch error for {}: {}", symbol, e);
                }
            }

            if sleep_or_cancel(cancel, INTER_SYMBOL_DELAY).await {
                return true;
            }
        }
        false
    }
}

/// Sleep for `duration` unless cancelled first; returns true if cancelled
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{AppError, Result};
    use crate::providers::types::Quote;
    use crate::providers::Provider;
    use crate::router::SymbolRouter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Succeeds for every symbol except `BAD`, counting calls
    struct FlakyProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn id(&self) -> &'static str {
            "flaky"
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol.contains("BAD") {
                return Err(AppError::Transient("upstream flapping".to_string()));
            }
            Ok(Quote::new(symbol, 100.0, "2025-09-16T10:00:00Z".to_string()))
        }
    }

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        });
        let router = SymbolRouter::new(
            provider.clone(),
            provider.clone(),
            provider.clone(),
            provider,
            vec!["USDT".to_string()],
        );
        let config = Config {
            subscriptions_file: dir.join("subscriptions.json"),
            snapshot_dir: dir.join("option_chain_data"),
            default_symbols: Vec::new(),
            ..Config::default()
        };
        Arc::new(AppState::with_router(config, router))
    }

    #[tokio::test]
    async fn test_pass_isolates_failures() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        state.subscriptions.add("GOOD");
        state.subscriptions.add("BAD");

        let poller = Poller::new(state.clone());
        let cancelled = poller
            .pass(&state.subscriptions.list(), &CancellationToken::new())
            .await;

        assert!(!cancelled);
        assert!(state.cache.get("GOOD").is_some());
        assert!(state.cache.get("BAD").is_none());
    }

    #[tokio::test]
    async fn test_pass_stores_canonical_symbol() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        state.subscriptions.add("NIFTY");

        let poller = Poller::new(state.clone());
        poller
            .pass(&state.subscriptions.list(), &CancellationToken::new())
            .await;

        // routed upstream spelling is ^NSEI; the cache key and the quote
        // symbol stay canonical
        let quote = state.cache.get("NIFTY").expect("index quote cached");
        assert_eq!(quote.symbol, "NIFTY");
    }

    #[tokio::test]
    async fn test_cancelled_pass_stops_early() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        state.subscriptions.add("A");
        state.subscriptions.add("B");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let poller = Poller::new(state.clone());
        let cancelled = poller.pass(&state.subscriptions.list(), &cancel).await;

        assert!(cancelled);
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_run_persists_subscriptions_after_pass() {
        let dir = tempdir().unwrap();
        let state = test_state(dir.path());
        state.subscriptions.add("GOOD");

        let cancel = CancellationToken::new();
        let handle = Poller::new(state.clone()).spawn(cancel.clone());

        // one pass (one symbol, ~200ms gap) then cancel during the
        // interval sleep
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
        handle.await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("subscriptions.json")).unwrap();
        assert!(raw.contains("GOOD"));
    }
}
