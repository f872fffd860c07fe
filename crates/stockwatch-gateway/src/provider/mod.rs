//! Market-data provider boundary.
//!
//! Handlers only ever talk to [`MarketDataProvider`]. The vendor client is an
//! external collaborator; this crate ships the trait, a fixture-backed
//! implementation seeded from config, and a wrapper that times every call.

pub mod fixture;
pub mod instrumented;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stockwatch_core::error::{Result, StockwatchError};

pub use fixture::FixtureProvider;
pub use instrumented::InstrumentedProvider;

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dividend {
    pub date: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionContract {
    pub strike: f64,
    pub last_price: f64,
    pub bid: f64,
    pub ask: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub open_interest: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionChain {
    /// `YYYY-MM-DD`
    pub expiration: String,
    #[serde(default)]
    pub calls: Vec<OptionContract>,
    #[serde(default)]
    pub puts: Vec<OptionContract>,
}

/// Canned data for one ticker (config `provider.fixtures`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickerFixture {
    pub ticker: String,
    #[serde(default)]
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub dividends: Vec<Dividend>,
    #[serde(default)]
    pub options: Vec<OptionChain>,
    /// Make every call for this ticker fail as an upstream error.
    #[serde(default)]
    pub fail: bool,
}

/// Lookback window accepted by the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    D1,
    D5,
    Mo1,
    Mo3,
    Mo6,
    Y1,
    Y2,
    Y5,
    Y10,
    Ytd,
    Max,
}

impl Period {
    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "1d" => Period::D1,
            "5d" => Period::D5,
            "1mo" => Period::Mo1,
            "3mo" => Period::Mo3,
            "6mo" => Period::Mo6,
            "1y" => Period::Y1,
            "2y" => Period::Y2,
            "5y" => Period::Y5,
            "10y" => Period::Y10,
            "ytd" => Period::Ytd,
            "max" => Period::Max,
            other => {
                return Err(StockwatchError::BadRequest(format!("invalid period: {other}")))
            }
        })
    }

    /// Trading days covered, `None` for unbounded.
    pub fn trading_days(self) -> Option<usize> {
        match self {
            Period::D1 => Some(1),
            Period::D5 => Some(5),
            Period::Mo1 => Some(21),
            Period::Mo3 => Some(63),
            Period::Mo6 => Some(126),
            Period::Y1 => Some(252),
            Period::Y2 => Some(504),
            Period::Y5 => Some(1260),
            Period::Y10 => Some(2520),
            Period::Ytd | Period::Max => None,
        }
    }
}

/// Bar width accepted by the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(&'static str);

impl Interval {
    const ALLOWED: [&'static str; 13] = [
        "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
    ];

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALLOWED
            .iter()
            .find(|a| **a == s)
            .map(|a| Interval(*a))
            .ok_or_else(|| StockwatchError::BadRequest(format!("invalid interval: {s}")))
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

/// Data provider (external collaborator).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn history(&self, ticker: &str, period: Period, interval: Interval) -> Result<Vec<Bar>>;
    async fn option_expirations(&self, ticker: &str) -> Result<Vec<String>>;
    async fn option_chain(&self, ticker: &str, expiration: &str) -> Result<OptionChain>;
    async fn dividends(&self, ticker: &str) -> Result<Vec<Dividend>>;
}
