use crate::error::{Result, StockwatchError};

/// Static description of a metric family.
///
/// Immutable once registered. The order of `label_names` fixes the meaning
/// of every label-value tuple recorded against the family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Reject names the exposition format cannot carry.
    pub(crate) fn validate(&self) -> Result<()> {
        if !is_metric_name(&self.name) {
            return Err(StockwatchError::InvalidArgument(format!(
                "invalid metric name: {:?}",
                self.name
            )));
        }
        for (i, label) in self.label_names.iter().enumerate() {
            if !is_label_name(label) || label == "le" || label.starts_with("__") {
                return Err(StockwatchError::InvalidArgument(format!(
                    "invalid label name {:?} on {}",
                    label, self.name
                )));
            }
            if self.label_names[..i].contains(label) {
                return Err(StockwatchError::InvalidArgument(format!(
                    "duplicate label name {:?} on {}",
                    label, self.name
                )));
            }
        }
        Ok(())
    }
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ordered label values identifying one series within a family.
///
/// Positional: value `i` belongs to label name `i` of the descriptor.
/// `Ord` is lexicographic over the values, which is the exposition order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(values: &[&str]) -> Self {
        Self(values.iter().map(|s| s.to_string()).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

/// Kind of a registered family. Histograms carry their bucket bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    Counter,
    Histogram { bounds: Vec<f64> },
}

impl MetricKind {
    /// Type name used on the `# TYPE` line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram { .. } => "histogram",
        }
    }
}
