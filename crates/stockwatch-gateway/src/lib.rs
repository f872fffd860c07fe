//! stockwatch gateway library entry.
//!
//! Wires config, the market-data provider, request instrumentation and the
//! HTTP routes into one axum service. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod provider;
pub mod router;
