//! Concurrent writers against one registry.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use stockwatch_core::metrics::{MetricDescriptor, MetricKind, MetricRegistry, Series};

const THREADS: usize = 8;
const PER_THREAD: usize = 10_000;

#[test]
fn concurrent_increments_are_not_lost() {
    let registry = MetricRegistry::new();
    let counter = registry
        .register_counter(MetricDescriptor::new("requests_total", "Requests", &["route"]))
        .unwrap();

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            let counter = counter.clone();
            s.spawn(move || {
                for _ in 0..PER_THREAD {
                    counter.inc(&["/stock/AAPL/price"]).unwrap();
                }
            });
        }
    });

    assert_eq!(counter.get(&["/stock/AAPL/price"]), (THREADS * PER_THREAD) as f64);
}

#[test]
fn concurrent_first_writers_share_one_series() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .register(MetricDescriptor::new("hits_total", "Hits", &["route"]), MetricKind::Counter)
        .unwrap();

    let seen: Vec<Series> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                s.spawn(move || registry.get_or_create_series("hits_total", &["/x"]).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for s in &seen[1..] {
        assert!(s.ptr_eq(&seen[0]));
    }
    let snap = registry.snapshot();
    assert_eq!(snap.family("hits_total").unwrap().series.len(), 1);
}

#[test]
fn histogram_snapshots_stay_consistent_under_writes() {
    let registry = MetricRegistry::new();
    let hist = registry
        .register_histogram(
            MetricDescriptor::new("latency_seconds", "Latency", &["route"]),
            &[0.5, 1.0, 10.0],
        )
        .unwrap();

    std::thread::scope(|s| {
        for t in 0..THREADS {
            let hist = hist.clone();
            s.spawn(move || {
                for i in 0..2_000 {
                    let v = ((t * 2_000 + i) % 12) as f64;
                    hist.observe(&["/x"], v).unwrap();
                }
            });
        }

        // Reader racing the writers.
        s.spawn(|| {
            for _ in 0..200 {
                let snap = registry.snapshot();
                if let Some(h) = snap.histogram("latency_seconds", &["/x"]) {
                    assert!(h.buckets.windows(2).all(|w| w[0] <= w[1]));
                    assert_eq!(*h.buckets.last().unwrap(), h.count);
                }
            }
        });
    });

    let v = hist.get(&["/x"]).unwrap();
    assert_eq!(v.count, (THREADS * 2_000) as u64);
    assert_eq!(v.bucket(f64::INFINITY), Some(v.count));
}
