//! # Utility Modules
//!
//! Supporting utilities for logging, metrics and diagnostics.
//!
//! ## Components
//! - **Hex**: Hex dumps of encoded messages for debug output
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters

pub mod hex;
pub mod logging;
pub mod metrics;

pub use hex::sprint_hex;
pub use metrics::{Metrics, MetricsObserver};
