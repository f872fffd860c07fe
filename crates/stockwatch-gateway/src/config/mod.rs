//! Service config loader (strict parsing).

pub mod schema;

use std::fs;

use stockwatch_core::error::{Result, StockwatchError};

pub use schema::{MetricsSection, ProviderSection, ServerSection, ServiceConfig, SymbolsSection};

/// Default config path, relative to the working directory.
pub const DEFAULT_PATH: &str = "stockwatch.yaml";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| StockwatchError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| StockwatchError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
