//! stockwatch core: the error surface and the in-process metrics subsystem.
//!
//! This crate defines the metric primitives (counters, histograms), the
//! process-wide registry that owns them, and the text exposition used by the
//! `/metrics` scrape endpoint. Nothing here knows about HTTP or the async
//! runtime; the gateway wires it into axum.
//!
//! # No-panic rule
//! `unwrap`, `expect` and `panic!` are denied by clippy in this crate.
//! Fallible paths return `StockwatchError`, so a bad metric call site
//! yields an error value the caller can log and drop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{ErrorKind, Result, StockwatchError};
