use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{Result, StockwatchError};

use super::descriptor::MetricDescriptor;
use super::registry::Family;

/// Default bucket bounds in seconds (same set as the Prometheus clients).
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Check and normalize caller-supplied bucket bounds.
///
/// Bounds must be finite and strictly ascending. A trailing `+Inf` is
/// dropped because the +Inf bucket is always implicit.
pub fn validate_bounds(bounds: &[f64]) -> Result<Vec<f64>> {
    let mut out: Vec<f64> = bounds.to_vec();
    if out.last().is_some_and(|b| *b == f64::INFINITY) {
        out.pop();
    }
    if out.is_empty() {
        return Err(StockwatchError::InvalidArgument(
            "histogram needs at least one finite bucket bound".into(),
        ));
    }
    if out.iter().any(|b| !b.is_finite()) {
        return Err(StockwatchError::InvalidArgument(
            "histogram bucket bounds must be finite".into(),
        ));
    }
    if out.windows(2).any(|w| w[0] >= w[1]) {
        return Err(StockwatchError::InvalidArgument(
            "histogram bucket bounds must be strictly ascending".into(),
        ));
    }
    Ok(out)
}

/// Point-in-time copy of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    /// Finite upper bounds, ascending.
    pub bounds: Vec<f64>,
    /// Cumulative counts, one per bound plus a trailing +Inf bucket.
    pub buckets: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramValue {
    /// Cumulative count of the bucket with upper bound `le`, if present.
    pub fn bucket(&self, le: f64) -> Option<u64> {
        if le == f64::INFINITY {
            return self.buckets.last().copied();
        }
        self.bounds
            .iter()
            .position(|b| *b == le)
            .map(|i| self.buckets[i])
    }
}

#[derive(Debug)]
struct HistogramState {
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

/// One histogram series.
///
/// Buckets, sum and count live behind one mutex so a snapshot never sees
/// a bucket array that disagrees with `count` or `sum`.
#[derive(Debug)]
pub struct HistogramSeries {
    bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

impl HistogramSeries {
    pub(crate) fn new(bounds: Arc<[f64]>) -> Self {
        let state = HistogramState {
            buckets: vec![0; bounds.len() + 1],
            sum: 0.0,
            count: 0,
        };
        Self {
            bounds,
            state: Mutex::new(state),
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation. NaN is rejected.
    pub fn observe(&self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(StockwatchError::InvalidArgument(
                "histogram observation must not be NaN".into(),
            ));
        }
        self.record(value);
        Ok(())
    }

    fn record(&self, value: f64) {
        // Every bucket with bound >= value, plus +Inf (the trailing slot).
        let first = self.bounds.partition_point(|b| *b < value);
        let mut st = self.lock();
        for c in &mut st.buckets[first..] {
            *c += 1;
        }
        st.sum += value;
        st.count += 1;
    }

    pub fn value(&self) -> HistogramValue {
        let st = self.lock();
        HistogramValue {
            bounds: self.bounds.to_vec(),
            buckets: st.buckets.clone(),
            sum: st.sum,
            count: st.count,
        }
    }

    // The state is plain counters; a panic mid-update cannot leave it in a
    // shape worse than a missed observation, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HistogramState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a registered histogram family.
#[derive(Clone, Debug)]
pub struct Histogram {
    family: Arc<Family>,
}

impl Histogram {
    pub(crate) fn new(family: Arc<Family>) -> Self {
        Self { family }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        self.family.descriptor()
    }

    pub fn observe(&self, labels: &[&str], value: f64) -> Result<()> {
        self.family.histogram_series(labels)?.observe(value)
    }

    /// Start a scoped timer for `labels`.
    ///
    /// The series is resolved up front, so label errors surface here and the
    /// returned guard cannot fail when it records.
    pub fn start_timer(&self, labels: &[&str]) -> Result<HistogramTimer> {
        let series = self.family.histogram_series(labels)?;
        Ok(HistogramTimer::new(series))
    }

    /// Current value of a series, without creating it.
    pub fn get(&self, labels: &[&str]) -> Option<HistogramValue> {
        self.family.lookup_histogram(labels).map(|s| s.value())
    }
}

/// Scoped timer guard.
///
/// Records the elapsed wall-clock seconds into its series exactly once:
/// explicitly through [`HistogramTimer::observe_duration`], or on drop. Drop
/// covers early returns, `?`, panics unwinding through the owner, and a
/// future that is dropped before completion.
#[must_use = "dropping the timer immediately records a near-zero duration"]
#[derive(Debug)]
pub struct HistogramTimer {
    series: Option<Arc<HistogramSeries>>,
    start: Instant,
}

impl HistogramTimer {
    fn new(series: Arc<HistogramSeries>) -> Self {
        Self {
            series: Some(series),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop now and return the recorded seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.finish().unwrap_or_default()
    }

    /// Abandon the measurement without recording anything.
    pub fn discard(mut self) {
        self.series = None;
    }

    fn finish(&mut self) -> Option<f64> {
        let series = self.series.take()?;
        let secs = self.start.elapsed().as_secs_f64();
        series.record(secs);
        Some(secs)
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.finish();
    }
}
