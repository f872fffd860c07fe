//! Prometheus text exposition (format 0.0.4).
//!
//! Pure transform from a [`RegistrySnapshot`] to text. Families arrive
//! sorted by name and series by label values, so two renders of an unchanged
//! registry are byte-identical.
//!
//! ```text
//! # HELP market_data_requests_total Total number of requests by route
//! # TYPE market_data_requests_total counter
//! market_data_requests_total{route="GET /stock/:ticker/price"} 3
//! # HELP market_data_request_latency_seconds Request latency in seconds
//! # TYPE market_data_request_latency_seconds histogram
//! market_data_request_latency_seconds_bucket{route="GET /",le="0.005"} 1
//! market_data_request_latency_seconds_bucket{route="GET /",le="+Inf"} 1
//! market_data_request_latency_seconds_sum{route="GET /"} 0.0004
//! market_data_request_latency_seconds_count{route="GET /"} 1
//! ```

use std::fmt::Write;

use super::descriptor::MetricDescriptor;
use super::registry::MetricRegistry;
use super::snapshot::{RegistrySnapshot, SeriesValue};

/// Content type served with the exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Integral values print without a fraction (`3`, `le="1"`); everything
/// else uses the shortest round-trip form.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "+Inf" } else { "-Inf" };
        s.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// `l1="v1",l2="v2"` for one series.
fn label_pairs(desc: &MetricDescriptor, values: &[String]) -> String {
    desc.label_names()
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn braced(pairs: &str) -> String {
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{pairs}}}")
    }
}

/// Render a snapshot.
pub fn render(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::with_capacity(4096);

    for family in &snapshot.families {
        let desc = &family.descriptor;
        let name = desc.name();
        let _ = writeln!(out, "# HELP {} {}", name, escape_help(desc.help()));
        let _ = writeln!(out, "# TYPE {} {}", name, family.kind.as_str());

        for series in &family.series {
            let pairs = label_pairs(desc, series.labels.values());
            match &series.value {
                SeriesValue::Counter(v) => {
                    let _ = writeln!(out, "{}{} {}", name, braced(&pairs), format_value(*v));
                }
                SeriesValue::Histogram(h) => {
                    let prefix = if pairs.is_empty() {
                        String::new()
                    } else {
                        format!("{pairs},")
                    };
                    for (bound, count) in h.bounds.iter().zip(&h.buckets) {
                        let _ = writeln!(
                            out,
                            "{}_bucket{{{}le=\"{}\"}} {}",
                            name,
                            prefix,
                            format_value(*bound),
                            count
                        );
                    }
                    let inf = h.buckets.last().copied().unwrap_or(h.count);
                    let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, inf);
                    let _ = writeln!(out, "{}_sum{} {}", name, braced(&pairs), format_value(h.sum));
                    let _ = writeln!(out, "{}_count{} {}", name, braced(&pairs), h.count);
                }
            }
        }
    }

    out
}

impl MetricRegistry {
    /// Snapshot and render in one step.
    pub fn render(&self) -> String {
        render(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricDescriptor;

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(10.0), "10");
        assert_eq!(format_value(-0.0), "0");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn label_values_are_escaped() {
        let r = MetricRegistry::new();
        let Ok(c) = r.register_counter(MetricDescriptor::new("c_total", "a\\b\nc", &["v"])) else {
            unreachable!("fresh registry")
        };
        assert!(c.inc(&["say \"hi\"\n\\"]).is_ok());
        let text = r.render();
        assert!(text.contains("# HELP c_total a\\\\b\\nc\n"));
        assert!(text.contains("c_total{v=\"say \\\"hi\\\"\\n\\\\\"} 1\n"));
    }

    #[test]
    fn unlabeled_series_have_no_braces() {
        let r = MetricRegistry::new();
        let (Ok(c), Ok(h)) = (
            r.register_counter(MetricDescriptor::new("up_total", "up", &[])),
            r.register_histogram(MetricDescriptor::new("d_seconds", "d", &[]), &[1.0]),
        ) else {
            unreachable!("fresh registry")
        };
        assert!(c.inc(&[]).is_ok());
        assert!(h.observe(&[], 0.5).is_ok());
        let text = r.render();
        assert!(text.contains("\nup_total 1\n"));
        assert!(text.contains("d_seconds_bucket{le=\"1\"} 1\n"));
        assert!(text.contains("d_seconds_bucket{le=\"+Inf\"} 1\n"));
        assert!(text.contains("d_seconds_sum 0.5\n"));
        assert!(text.contains("d_seconds_count 1\n"));
    }

    #[test]
    fn empty_family_still_has_header() {
        let r = MetricRegistry::new();
        assert!(r
            .register_counter(MetricDescriptor::new("idle_total", "never written", &["x"]))
            .is_ok());
        assert_eq!(
            r.render(),
            "# HELP idle_total never written\n# TYPE idle_total counter\n"
        );
    }
}
