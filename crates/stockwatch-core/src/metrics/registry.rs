//! Process-wide owner of metric families and their series.
//!
//! One registry per process, created at startup and shared through `Arc`.
//! Families are keyed by name in a sharded `DashMap`; each family keeps its
//! own `DashMap` from label values to series, so lookup-or-create only locks
//! one shard of one family.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, StockwatchError};

use super::counter::{Counter, CounterSeries};
use super::descriptor::{LabelSet, MetricDescriptor, MetricKind};
use super::histogram::{validate_bounds, Histogram, HistogramSeries};
use super::snapshot::{FamilySnapshot, RegistrySnapshot, SeriesSnapshot, SeriesValue};

/// One concrete series. Clones share the same underlying value.
#[derive(Debug, Clone)]
pub enum Series {
    Counter(Arc<CounterSeries>),
    Histogram(Arc<HistogramSeries>),
}

impl Series {
    /// True when both handles point at the same series.
    pub fn ptr_eq(&self, other: &Series) -> bool {
        match (self, other) {
            (Series::Counter(a), Series::Counter(b)) => Arc::ptr_eq(a, b),
            (Series::Histogram(a), Series::Histogram(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn value(&self) -> SeriesValue {
        match self {
            Series::Counter(c) => SeriesValue::Counter(c.get()),
            Series::Histogram(h) => SeriesValue::Histogram(h.value()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Family {
    descriptor: MetricDescriptor,
    kind: MetricKind,
    bounds: Arc<[f64]>,
    series: DashMap<LabelSet, Series>,
}

impl Family {
    fn new(descriptor: MetricDescriptor, kind: MetricKind) -> Self {
        let bounds: Arc<[f64]> = match &kind {
            MetricKind::Histogram { bounds } => Arc::from(bounds.as_slice()),
            MetricKind::Counter => Arc::from(Vec::new()),
        };
        Self {
            descriptor,
            kind,
            bounds,
            series: DashMap::new(),
        }
    }

    pub(crate) fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    fn check_arity(&self, labels: &[&str]) -> Result<()> {
        let expected = self.descriptor.label_names().len();
        if labels.len() != expected {
            return Err(StockwatchError::LabelArityMismatch {
                name: self.descriptor.name().to_string(),
                expected,
                got: labels.len(),
            });
        }
        Ok(())
    }

    fn fresh(&self) -> Series {
        match self.kind {
            MetricKind::Counter => Series::Counter(Arc::new(CounterSeries::new())),
            MetricKind::Histogram { .. } => {
                Series::Histogram(Arc::new(HistogramSeries::new(Arc::clone(&self.bounds))))
            }
        }
    }

    fn get_or_create(&self, labels: &[&str]) -> Result<Series> {
        self.check_arity(labels)?;
        let key = LabelSet::new(labels);

        // Fast path: shard read lock only.
        if let Some(existing) = self.series.get(&key) {
            return Ok(existing.value().clone());
        }

        // Slow path: the entry API holds the shard write lock, so concurrent
        // first writers agree on a single series.
        let series = self.series.entry(key).or_insert_with(|| self.fresh());
        Ok(series.value().clone())
    }

    fn lookup(&self, labels: &[&str]) -> Option<Series> {
        if labels.len() != self.descriptor.label_names().len() {
            return None;
        }
        self.series
            .get(&LabelSet::new(labels))
            .map(|s| s.value().clone())
    }

    fn kind_mismatch(&self, wanted: &str) -> StockwatchError {
        StockwatchError::InvalidArgument(format!(
            "{} is a {}, not a {wanted}",
            self.descriptor.name(),
            self.kind.as_str()
        ))
    }

    pub(crate) fn counter_series(&self, labels: &[&str]) -> Result<Arc<CounterSeries>> {
        match self.get_or_create(labels)? {
            Series::Counter(c) => Ok(c),
            Series::Histogram(_) => Err(self.kind_mismatch("counter")),
        }
    }

    pub(crate) fn histogram_series(&self, labels: &[&str]) -> Result<Arc<HistogramSeries>> {
        match self.get_or_create(labels)? {
            Series::Histogram(h) => Ok(h),
            Series::Counter(_) => Err(self.kind_mismatch("histogram")),
        }
    }

    pub(crate) fn lookup_counter(&self, labels: &[&str]) -> Option<Arc<CounterSeries>> {
        match self.lookup(labels)? {
            Series::Counter(c) => Some(c),
            Series::Histogram(_) => None,
        }
    }

    pub(crate) fn lookup_histogram(&self, labels: &[&str]) -> Option<Arc<HistogramSeries>> {
        match self.lookup(labels)? {
            Series::Histogram(h) => Some(h),
            Series::Counter(_) => None,
        }
    }

    fn snapshot(&self) -> FamilySnapshot {
        // Clone the handles out first; values are read after the shard locks
        // are released so writers are only ever blocked per series.
        let handles: Vec<(LabelSet, Series)> = self
            .series
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut series: Vec<SeriesSnapshot> = handles
            .into_iter()
            .map(|(labels, s)| SeriesSnapshot {
                labels,
                value: s.value(),
            })
            .collect();
        series.sort_by(|a, b| a.labels.cmp(&b.labels));

        FamilySnapshot {
            descriptor: self.descriptor.clone(),
            kind: self.kind.clone(),
            series,
        }
    }
}

/// Central registry for metric families.
///
/// # Example
///
/// ```
/// use stockwatch_core::metrics::{MetricDescriptor, MetricRegistry};
///
/// let registry = MetricRegistry::new();
/// let requests = registry
///     .register_counter(MetricDescriptor::new("requests_total", "Requests", &["route"]))
///     .unwrap();
/// requests.inc(&["/stock/AAPL/price"]).unwrap();
/// assert_eq!(requests.get(&["/stock/AAPL/price"]), 1.0);
/// ```
#[derive(Debug, Default)]
pub struct MetricRegistry {
    families: DashMap<String, Arc<Family>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family. Fails with `DuplicateMetric` if the name is taken.
    pub fn register(&self, descriptor: MetricDescriptor, kind: MetricKind) -> Result<()> {
        self.insert(descriptor, kind).map(|_| ())
    }

    pub fn register_counter(&self, descriptor: MetricDescriptor) -> Result<Counter> {
        self.insert(descriptor, MetricKind::Counter).map(Counter::new)
    }

    pub fn register_histogram(
        &self,
        descriptor: MetricDescriptor,
        bounds: &[f64],
    ) -> Result<Histogram> {
        let kind = MetricKind::Histogram {
            bounds: bounds.to_vec(),
        };
        self.insert(descriptor, kind).map(Histogram::new)
    }

    fn insert(&self, descriptor: MetricDescriptor, kind: MetricKind) -> Result<Arc<Family>> {
        descriptor.validate()?;
        let kind = match kind {
            MetricKind::Histogram { bounds } => MetricKind::Histogram {
                bounds: validate_bounds(&bounds)?,
            },
            MetricKind::Counter => MetricKind::Counter,
        };

        match self.families.entry(descriptor.name().to_string()) {
            Entry::Occupied(e) => Err(StockwatchError::DuplicateMetric(e.key().clone())),
            Entry::Vacant(e) => {
                tracing::debug!(metric = %descriptor.name(), kind = kind.as_str(), "metric registered");
                let family = Arc::new(Family::new(descriptor, kind));
                e.insert(Arc::clone(&family));
                Ok(family)
            }
        }
    }

    fn family(&self, name: &str) -> Result<Arc<Family>> {
        self.families
            .get(name)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| StockwatchError::UnknownMetric(name.to_string()))
    }

    /// Handle to an already registered counter.
    pub fn counter(&self, name: &str) -> Result<Counter> {
        let family = self.family(name)?;
        if matches!(family.kind, MetricKind::Counter) {
            Ok(Counter::new(family))
        } else {
            Err(family.kind_mismatch("counter"))
        }
    }

    /// Handle to an already registered histogram.
    pub fn histogram(&self, name: &str) -> Result<Histogram> {
        let family = self.family(name)?;
        if matches!(family.kind, MetricKind::Histogram { .. }) {
            Ok(Histogram::new(family))
        } else {
            Err(family.kind_mismatch("histogram"))
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<MetricDescriptor> {
        self.families.get(name).map(|f| f.descriptor.clone())
    }

    /// Existing series for `labels`, or a freshly inserted zero series.
    ///
    /// Repeated calls with the same labels return the same series
    /// (see [`Series::ptr_eq`]).
    pub fn get_or_create_series(&self, name: &str, labels: &[&str]) -> Result<Series> {
        self.family(name)?.get_or_create(labels)
    }

    /// Read-only copy of every family, sorted by name, series sorted by
    /// label values. Each series is internally consistent; the snapshot as
    /// a whole is not atomic across series.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let families: Vec<Arc<Family>> = self
            .families
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();

        let mut families: Vec<FamilySnapshot> = families.iter().map(|f| f.snapshot()).collect();
        families.sort_by(|a, b| a.descriptor.name().cmp(b.descriptor.name()));
        RegistrySnapshot { families }
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
