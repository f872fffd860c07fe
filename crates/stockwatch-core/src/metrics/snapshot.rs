//! Read-only copies of registry state, consumed by the exposition renderer
//! and by tests.

use super::descriptor::{LabelSet, MetricDescriptor, MetricKind};
use super::histogram::HistogramValue;

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Counter(f64),
    Histogram(HistogramValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub labels: LabelSet,
    pub value: SeriesValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub descriptor: MetricDescriptor,
    pub kind: MetricKind,
    /// Sorted by label values.
    pub series: Vec<SeriesSnapshot>,
}

impl FamilySnapshot {
    pub fn series(&self, labels: &[&str]) -> Option<&SeriesValue> {
        let key = LabelSet::new(labels);
        self.series
            .binary_search_by(|s| s.labels.cmp(&key))
            .ok()
            .map(|i| &self.series[i].value)
    }
}

/// Families sorted by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrySnapshot {
    pub families: Vec<FamilySnapshot>,
}

impl RegistrySnapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families
            .binary_search_by(|f| f.descriptor.name().cmp(name))
            .ok()
            .map(|i| &self.families[i])
    }

    /// Counter value at `labels`, if that series exists.
    pub fn counter(&self, name: &str, labels: &[&str]) -> Option<f64> {
        match self.family(name)?.series(labels)? {
            SeriesValue::Counter(v) => Some(*v),
            SeriesValue::Histogram(_) => None,
        }
    }

    /// Histogram value at `labels`, if that series exists.
    pub fn histogram(&self, name: &str, labels: &[&str]) -> Option<&HistogramValue> {
        match self.family(name)?.series(labels)? {
            SeriesValue::Histogram(h) => Some(h),
            SeriesValue::Counter(_) => None,
        }
    }
}
