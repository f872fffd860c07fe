//! Fixture-backed provider seeded from config.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use stockwatch_core::error::{Result, StockwatchError};

use super::{Bar, Dividend, Interval, MarketDataProvider, OptionChain, Period, TickerFixture};
use crate::config::ProviderSection;

/// In-memory provider. Tickers are matched case-insensitively.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    tickers: HashMap<String, TickerFixture>,
    latency: Duration,
}

impl FixtureProvider {
    pub fn new(fixtures: Vec<TickerFixture>) -> Self {
        let tickers = fixtures
            .into_iter()
            .map(|f| (f.ticker.trim().to_ascii_uppercase(), f))
            .collect();
        Self {
            tickers,
            latency: Duration::ZERO,
        }
    }

    pub fn from_config(cfg: &ProviderSection) -> Self {
        Self::new(cfg.fixtures.clone()).with_latency(Duration::from_millis(cfg.simulated_latency_ms))
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn lookup(&self, ticker: &str) -> Result<&TickerFixture> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let fixture = self
            .tickers
            .get(&ticker.trim().to_ascii_uppercase())
            .ok_or_else(|| StockwatchError::NotFound(format!("no data found for ticker {ticker}")))?;
        if fixture.fail {
            return Err(StockwatchError::Upstream(format!(
                "provider unavailable for {ticker}"
            )));
        }
        Ok(fixture)
    }
}

#[async_trait]
impl MarketDataProvider for FixtureProvider {
    async fn history(&self, ticker: &str, period: Period, _interval: Interval) -> Result<Vec<Bar>> {
        let bars = &self.lookup(ticker).await?.bars;
        let take = period.trading_days().unwrap_or(bars.len()).min(bars.len());
        Ok(bars[bars.len() - take..].to_vec())
    }

    async fn option_expirations(&self, ticker: &str) -> Result<Vec<String>> {
        let fixture = self.lookup(ticker).await?;
        Ok(fixture.options.iter().map(|c| c.expiration.clone()).collect())
    }

    async fn option_chain(&self, ticker: &str, expiration: &str) -> Result<OptionChain> {
        let fixture = self.lookup(ticker).await?;
        Ok(fixture
            .options
            .iter()
            .find(|c| c.expiration == expiration)
            .cloned()
            .unwrap_or_else(|| OptionChain {
                expiration: expiration.to_string(),
                calls: Vec::new(),
                puts: Vec::new(),
            }))
    }

    async fn dividends(&self, ticker: &str) -> Result<Vec<Dividend>> {
        Ok(self.lookup(ticker).await?.dividends.clone())
    }
}
