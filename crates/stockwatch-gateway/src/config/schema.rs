use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;
use stockwatch_core::error::{Result, StockwatchError};
use stockwatch_core::metrics::{validate_bounds, DEFAULT_BUCKETS};

use crate::provider::TickerFixture;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub provider: ProviderSection,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(StockwatchError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.provider.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            StockwatchError::BadRequest(format!("server.listen must be a socket address: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_buckets")]
    pub latency_buckets: Vec<f64>,

    #[serde(default = "default_buckets")]
    pub provider_buckets: Vec<f64>,

    #[serde(default)]
    pub symbols: SymbolsSection,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            latency_buckets: default_buckets(),
            provider_buckets: default_buckets(),
            symbols: SymbolsSection::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        validate_bounds(&self.latency_buckets)
            .map_err(|e| StockwatchError::BadRequest(format!("metrics.latency_buckets: {e}")))?;
        validate_bounds(&self.provider_buckets)
            .map_err(|e| StockwatchError::BadRequest(format!("metrics.provider_buckets: {e}")))?;
        self.symbols.validate()
    }
}

fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}

/// Bounds the `symbol` label of the per-symbol request counter.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolsSection {
    /// Distinct symbols tracked before new ones fold into `__other__`.
    #[serde(default = "default_max_tracked")]
    pub max_tracked: usize,

    /// When non-empty, only these symbols get their own series.
    #[serde(default)]
    pub allowlist: Vec<String>,
}

impl Default for SymbolsSection {
    fn default() -> Self {
        Self {
            max_tracked: default_max_tracked(),
            allowlist: Vec::new(),
        }
    }
}

impl SymbolsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100_000).contains(&self.max_tracked) {
            return Err(StockwatchError::BadRequest(
                "metrics.symbols.max_tracked must be between 1 and 100000".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_tracked() -> usize {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Artificial delay added to every fixture call.
    #[serde(default)]
    pub simulated_latency_ms: u64,

    #[serde(default)]
    pub fixtures: Vec<TickerFixture>,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            simulated_latency_ms: 0,
            fixtures: Vec::new(),
        }
    }
}

impl ProviderSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.timeout_ms) {
            return Err(StockwatchError::BadRequest(
                "provider.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.simulated_latency_ms > 60_000 {
            return Err(StockwatchError::BadRequest(
                "provider.simulated_latency_ms must be at most 60000".into(),
            ));
        }

        let mut seen = HashSet::new();
        for f in &self.fixtures {
            let ticker = f.ticker.trim().to_ascii_uppercase();
            if ticker.is_empty() {
                return Err(StockwatchError::BadRequest(
                    "provider.fixtures: ticker must not be empty".into(),
                ));
            }
            if !seen.insert(ticker.clone()) {
                return Err(StockwatchError::BadRequest(format!(
                    "provider.fixtures: duplicate ticker {ticker}"
                )));
            }
        }
        Ok(())
    }
}

fn default_timeout_ms() -> u64 {
    5000
}
