//! Service metric families and the recording hooks used around handlers.
//!
//! Families are registered once at startup into a shared
//! [`MetricRegistry`]; a duplicate name there aborts startup. Everything
//! after that is fail-open: a recording error is logged and dropped, never
//! surfaced to the request.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use stockwatch_core::error::{ErrorKind, Result, StockwatchError};
use stockwatch_core::metrics::{
    CardinalityGuard, Counter, Histogram, HistogramTimer, MetricDescriptor, MetricRegistry,
};

use crate::config::MetricsSection;

pub const REQUESTS_TOTAL: &str = "market_data_requests_total";
pub const REQUEST_LATENCY: &str = "market_data_request_latency_seconds";
pub const ERRORS_TOTAL: &str = "market_data_errors_total";
pub const PROVIDER_DURATION: &str = "provider_api_duration_seconds";
pub const SYMBOL_REQUESTS: &str = "stock_symbol_requests_total";

/// A failed outcome that can be classified into the error counter.
pub trait Failure {
    fn kind(&self) -> ErrorKind;
}

impl Failure for StockwatchError {
    fn kind(&self) -> ErrorKind {
        StockwatchError::kind(self)
    }
}

#[derive(Clone)]
pub struct ServiceMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<MetricRegistry>,
    requests: Counter,
    latency: Histogram,
    errors: Counter,
    provider_calls: Histogram,
    symbols: Counter,
    symbol_guard: CardinalityGuard,
}

impl ServiceMetrics {
    /// Register the service families into `registry`.
    pub fn register(registry: Arc<MetricRegistry>, cfg: &MetricsSection) -> Result<Self> {
        let requests = registry.register_counter(MetricDescriptor::new(
            REQUESTS_TOTAL,
            "Total number of requests by route",
            &["route"],
        ))?;
        let latency = registry.register_histogram(
            MetricDescriptor::new(REQUEST_LATENCY, "Request latency in seconds", &["route"]),
            &cfg.latency_buckets,
        )?;
        let errors = registry.register_counter(MetricDescriptor::new(
            ERRORS_TOTAL,
            "Total number of failed requests by error kind",
            &["kind"],
        ))?;
        let provider_calls = registry.register_histogram(
            MetricDescriptor::new(
                PROVIDER_DURATION,
                "Market data provider call duration in seconds",
                &["operation"],
            ),
            &cfg.provider_buckets,
        )?;
        let symbols = registry.register_counter(MetricDescriptor::new(
            SYMBOL_REQUESTS,
            "Requests per ticker symbol",
            &["symbol"],
        ))?;

        let symbol_guard = if cfg.symbols.allowlist.is_empty() {
            CardinalityGuard::new(cfg.symbols.max_tracked)
        } else {
            CardinalityGuard::with_allowlist(&cfg.symbols.allowlist)
        };

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                requests,
                latency,
                errors,
                provider_calls,
                symbols,
                symbol_guard,
            }),
        })
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.inner.registry
    }

    /// Prometheus text for the whole registry.
    pub fn render(&self) -> String {
        self.inner.registry.render()
    }

    /// Count one request for `symbol`. Unknown or excess symbols fold into a
    /// shared label value.
    pub fn track_symbol_request(&self, symbol: &str) {
        let label = self.inner.symbol_guard.admit(symbol);
        dropped(SYMBOL_REQUESTS, self.inner.symbols.inc(&[&label]));
    }

    /// Timer for one provider call; records when dropped.
    pub fn track_provider_operation(&self, operation: &str) -> Option<HistogramTimer> {
        dropped(
            PROVIDER_DURATION,
            self.inner.provider_calls.start_timer(&[operation]),
        )
    }

    pub fn record_error(&self, kind: ErrorKind) {
        dropped(ERRORS_TOTAL, self.inner.errors.inc(&[kind.as_str()]));
    }

    /// Run `next` as one request on `route`.
    ///
    /// Counts the request, times it, and on failure counts exactly one error
    /// of the failure's kind. The outcome is returned untouched. A panic is
    /// counted as `panic` and resumed; if the returned future is dropped
    /// early the request is counted as `cancelled`.
    pub async fn instrument<F, T, E>(&self, route: &str, next: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Failure,
    {
        dropped(REQUESTS_TOTAL, self.inner.requests.inc(&[route]));
        let mut guard = RequestGuard {
            metrics: self,
            timer: dropped(REQUEST_LATENCY, self.inner.latency.start_timer(&[route])),
            finished: false,
        };

        match AssertUnwindSafe(next).catch_unwind().await {
            Ok(Ok(v)) => {
                guard.finish(None);
                Ok(v)
            }
            Ok(Err(e)) => {
                guard.finish(Some(e.kind()));
                Err(e)
            }
            Err(panic) => {
                guard.finish(Some(ErrorKind::Panic));
                std::panic::resume_unwind(panic)
            }
        }
    }
}

struct RequestGuard<'a> {
    metrics: &'a ServiceMetrics,
    timer: Option<HistogramTimer>,
    finished: bool,
}

impl RequestGuard<'_> {
    // Latency is recorded before the error count.
    fn finish(&mut self, failure: Option<ErrorKind>) {
        self.finished = true;
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
        if let Some(kind) = failure {
            self.metrics.record_error(kind);
        }
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Some(ErrorKind::Cancelled));
        }
    }
}

fn dropped<T>(metric: &str, res: Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::error!(metric, error = %e, "metric observation dropped");
            None
        }
    }
}
