//! Provider wrapper that times every outbound call.
//!
//! This is the narrower instrumentation point nested inside the request
//! middleware: each call records into `provider_api_duration_seconds`
//! labelled by operation, and is bounded by the configured timeout. The
//! timer is a drop guard, so timeouts and errors are still observed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use stockwatch_core::error::{Result, StockwatchError};

use super::{Bar, Dividend, Interval, MarketDataProvider, OptionChain, Period};
use crate::obs::ServiceMetrics;

pub struct InstrumentedProvider {
    inner: Arc<dyn MarketDataProvider>,
    metrics: ServiceMetrics,
    timeout: Duration,
}

impl InstrumentedProvider {
    pub fn new(inner: Arc<dyn MarketDataProvider>, metrics: ServiceMetrics, timeout: Duration) -> Self {
        Self {
            inner,
            metrics,
            timeout,
        }
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let _timer = self.metrics.track_provider_operation(operation);
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "provider call timed out"
                );
                Err(StockwatchError::Timeout(operation.to_string()))
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for InstrumentedProvider {
    async fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Bar>> {
        self.call("history", self.inner.history(ticker, period, interval))
            .await
    }

    async fn option_expirations(&self, ticker: &str) -> Result<Vec<String>> {
        self.call("option_expirations", self.inner.option_expirations(ticker))
            .await
    }

    async fn option_chain(&self, ticker: &str, expiration: &str) -> Result<OptionChain> {
        self.call("option_chain", self.inner.option_chain(ticker, expiration))
            .await
    }

    async fn dividends(&self, ticker: &str) -> Result<Vec<Dividend>> {
        self.call("dividends", self.inner.dividends(ticker)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsSection;
    use crate::obs::metrics::PROVIDER_DURATION;
    use crate::provider::{FixtureProvider, TickerFixture};
    use stockwatch_core::metrics::MetricRegistry;

    fn fixture() -> TickerFixture {
        TickerFixture {
            ticker: "AAPL".into(),
            bars: vec![],
            dividends: vec![],
            options: vec![],
            fail: false,
        }
    }

    fn metrics() -> ServiceMetrics {
        ServiceMetrics::register(Arc::new(MetricRegistry::new()), &MetricsSection::default())
            .unwrap()
    }

    #[tokio::test]
    async fn each_call_is_timed_once() {
        let m = metrics();
        let p = InstrumentedProvider::new(
            Arc::new(FixtureProvider::new(vec![fixture()])),
            m.clone(),
            Duration::from_secs(1),
        );
        p.dividends("AAPL").await.unwrap();
        assert!(p.dividends("NOPE").await.is_err());

        let snap = m.registry().snapshot();
        assert_eq!(snap.histogram(PROVIDER_DURATION, &["dividends"]).unwrap().count, 2);
        assert!(snap.histogram(PROVIDER_DURATION, &["history"]).is_none());
    }

    #[tokio::test]
    async fn timeout_is_observed_and_reported() {
        let m = metrics();
        let slow = FixtureProvider::new(vec![fixture()]).with_latency(Duration::from_millis(300));
        let p = InstrumentedProvider::new(Arc::new(slow), m.clone(), Duration::from_millis(20));

        let err = p.option_expirations("AAPL").await.unwrap_err();
        assert_eq!(err, StockwatchError::Timeout("option_expirations".into()));

        let snap = m.registry().snapshot();
        let h = snap.histogram(PROVIDER_DURATION, &["option_expirations"]).unwrap();
        assert_eq!(h.count, 1);
        assert!(h.sum < 0.3);
    }
}
