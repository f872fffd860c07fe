//! Top-level facade crate for stockwatch.
//!
//! Re-exports the metrics core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use stockwatch_core::*;
}

pub mod gateway {
    pub use stockwatch_gateway::*;
}
