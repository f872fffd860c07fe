//! Shared application state.
//!
//! Startup errors are explicit: a bad metric registration comes back as
//! `Err` so `main` can log it and exit instead of panicking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stockwatch_core::error::Result;
use stockwatch_core::metrics::MetricRegistry;

use crate::config::ServiceConfig;
use crate::obs::ServiceMetrics;
use crate::provider::{FixtureProvider, InstrumentedProvider, MarketDataProvider};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: ServiceMetrics,
    provider: Arc<dyn MarketDataProvider>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    draining: AtomicBool,
}

impl AppState {
    /// Build state backed by the configured fixtures.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let provider = Arc::new(FixtureProvider::from_config(&cfg.provider));
        Self::with_provider(cfg, provider)
    }

    /// Build state around any provider. Every call it serves is timed and
    /// bounded by `provider.timeout_ms`.
    pub fn with_provider(cfg: ServiceConfig, provider: Arc<dyn MarketDataProvider>) -> Result<Self> {
        let registry = Arc::new(MetricRegistry::new());
        let metrics = ServiceMetrics::register(registry, &cfg.metrics)?;

        let timeout = Duration::from_millis(cfg.provider.timeout_ms);
        let provider = Arc::new(InstrumentedProvider::new(provider, metrics.clone(), timeout));

        tracing::debug!(
            families = metrics.registry().len(),
            timeout_ms = cfg.provider.timeout_ms,
            "app state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                draining: AtomicBool::new(false),
            }),
            metrics,
            provider,
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
