//! In-process metrics: typed primitives, the registry that owns them, and
//! the text exposition rendered for pull-based collectors.
//!
//! Descriptors are registered once at startup; series are created lazily on
//! first write (one per distinct label-value tuple) and updated in place.
//! Lock granularity is per family (sharded `DashMap`) and per series
//! (atomics for counters, a short mutex for histograms), so unrelated
//! endpoints never contend on a registry-wide lock.

mod cardinality;
mod counter;
mod descriptor;
pub mod exposition;
mod histogram;
mod registry;
mod snapshot;

pub use cardinality::{CardinalityGuard, INVALID_LABEL, OTHER_LABEL};
pub use counter::{Counter, CounterSeries};
pub use descriptor::{LabelSet, MetricDescriptor, MetricKind};
pub use histogram::{
    validate_bounds, Histogram, HistogramSeries, HistogramTimer, HistogramValue, DEFAULT_BUCKETS,
};
pub use registry::{MetricRegistry, Series};
pub use snapshot::{FamilySnapshot, RegistrySnapshot, SeriesSnapshot, SeriesValue};
