//! Request and provider instrumentation.
//!
//! `metrics` owns the service's metric families and the side-channel hooks
//! handlers call; `middleware` plugs request instrumentation into axum.

pub mod metrics;
pub mod middleware;

pub use metrics::{Failure, ServiceMetrics};
pub use middleware::{route_label, track_requests};
