use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, StockwatchError};

use super::descriptor::MetricDescriptor;
use super::registry::Family;

/// Value of one counter series.
///
/// Stored as the bit pattern of an `f64` so fractional increments stay
/// lock-free; updates go through a CAS loop and are never lost.
#[derive(Debug, Default)]
pub struct CounterSeries {
    bits: AtomicU64,
}

impl CounterSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount`, which must be finite and non-negative.
    pub fn inc_by(&self, amount: f64) -> Result<()> {
        check_amount(amount)?;
        self.add(amount);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn add(&self, amount: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some((f64::from_bits(cur) + amount).to_bits())
            });
    }
}

fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(StockwatchError::InvalidArgument(format!(
            "counter increment must be finite and non-negative, got {amount}"
        )));
    }
    Ok(())
}

/// Handle to a registered counter family.
///
/// Cheap to clone; all clones share the family's series.
#[derive(Clone, Debug)]
pub struct Counter {
    family: Arc<Family>,
}

impl Counter {
    pub(crate) fn new(family: Arc<Family>) -> Self {
        Self { family }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[&str]) -> Result<()> {
        self.inc_by(labels, 1.0)
    }

    /// Increment by an explicit amount. Invalid amounts are rejected before
    /// any series is created.
    pub fn inc_by(&self, labels: &[&str], amount: f64) -> Result<()> {
        check_amount(amount)?;
        self.family.counter_series(labels)?.add(amount);
        Ok(())
    }

    /// Current value; 0 for a series that was never written.
    pub fn get(&self, labels: &[&str]) -> f64 {
        self.family
            .lookup_counter(labels)
            .map(|s| s.get())
            .unwrap_or(0.0)
    }
}
