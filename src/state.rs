//! Application state wiring
//!
//! Everything mutable or shared is constructed here once at startup and
//! passed to the components that need it. No process-wide singletons
//! beyond the configuration values captured inside.

use crate::cache::QuoteCache;
use crate::config::Config;
use crate::options::snapshot::SnapshotStore;
use crate::providers::binance::BinanceProvider;
use crate::providers::forex::ForexProvider;
use crate::providers::nse::NseProvider;
use crate::providers::{equities_provider, Provider};
use crate::router::SymbolRouter;
use crate::subscriptions::SubscriptionStore;
use std::sync::Arc;
use tracing::info;

/// Shared service state
pub struct AppState {
    pub config: Config,
    pub cache: QuoteCache,
    pub subscriptions: SubscriptionStore,
    pub router: SymbolRouter,
    pub snapshots: SnapshotStore,
}

impl AppState {
    /// Wire up adapters, cache and stores from configuration
    pub fn new(config: Config) -> Self {
        let equities = equities_provider(&config);
        info!("Using equities provider: {}", equities.id());

        let crypto: Arc<dyn Provider> = Arc::new(BinanceProvider::new());
        let forex: Arc<dyn Provider> = Arc::new(ForexProvider::new());
        let exchange: Arc<dyn Provider> = Arc::new(NseProvider::new());

        let router = SymbolRouter::new(
            equities,
            crypto,
            forex,
            exchange,
            config.crypto_tokens.clone(),
        );

        let subscriptions =
            SubscriptionStore::load(&config.subscriptions_file, &config.default_symbols);
        let snapshots = SnapshotStore::new(config.snapshot_dir.clone());

        Self {
            config,
            cache: QuoteCache::new(),
            subscriptions,
            router,
            snapshots,
        }
    }

    /// State with an injected router, for tests that stub adapters
    #[cfg(test)]
    pub fn with_router(config: Config, router: SymbolRouter) -> Self {
        let subscriptions =
            SubscriptionStore::load(&config.subscriptions_file, &config.default_symbols);
        let snapshots = SnapshotStore::new(config.snapshot_dir.clone());
        Self {
            config,
            cache: QuoteCache::new(),
            subscriptions,
            router,
            snapshots,
        }
    }
}
