//! Observability and Metrics
//!
//! Counters for codec and call activity, fed through the
//! [`Observer`](crate::core::observer::Observer) hook so the codec itself stays
//! free of shared state.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::observer::Observer;
use crate::core::value::Value;
use crate::error::{DecodeError, EncodeError};

/// Metrics collector for codec and call operations
#[derive(Debug)]
pub struct Metrics {
    /// Top-level values encoded
    pub values_encoded: AtomicU64,
    /// Bytes produced by the encoder
    pub bytes_encoded: AtomicU64,
    /// Failed encodes
    pub encode_errors: AtomicU64,
    /// Messages decoded
    pub values_decoded: AtomicU64,
    /// Bytes consumed by the decoder
    pub bytes_decoded: AtomicU64,
    /// Failed decodes
    pub decode_errors: AtomicU64,
    /// Remote calls sent
    pub calls_total: AtomicU64,
    /// Fault replies received or produced
    pub faults_total: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            values_encoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            values_decoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            calls_total: AtomicU64::new(0),
            faults_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful encode
    pub fn value_encoded(&self, byte_count: u64) {
        self.values_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a failed encode
    pub fn encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful decode
    pub fn value_decoded(&self, byte_count: u64) {
        self.values_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a failed decode
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an outgoing call
    pub fn call_sent(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fault reply
    pub fn fault(&self) {
        self.faults_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            values_encoded: self.values_encoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            values_decoded: self.values_decoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            calls_total: self.calls_total.load(Ordering::Relaxed),
            faults_total: self.faults_total.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            values_encoded = snapshot.values_encoded,
            bytes_encoded = snapshot.bytes_encoded,
            encode_errors = snapshot.encode_errors,
            values_decoded = snapshot.values_decoded,
            bytes_decoded = snapshot.bytes_decoded,
            decode_errors = snapshot.decode_errors,
            calls_total = snapshot.calls_total,
            faults_total = snapshot.faults_total,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub values_encoded: u64,
    pub bytes_encoded: u64,
    pub encode_errors: u64,
    pub values_decoded: u64,
    pub bytes_decoded: u64,
    pub decode_errors: u64,
    pub calls_total: u64,
    pub faults_total: u64,
    pub uptime_seconds: u64,
}

/// Observer that counts into a shared [`Metrics`]
#[derive(Debug, Clone, Default)]
pub struct MetricsObserver {
    metrics: Arc<Metrics>,
}

impl MetricsObserver {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl Observer for MetricsObserver {
    fn encoded(&self, _value: &Value, bytes: &[u8]) {
        self.metrics.value_encoded(bytes.len() as u64);
    }

    fn encode_failed(&self, _error: &EncodeError) {
        self.metrics.encode_error();
    }

    fn decoded(&self, _value: &Value, bytes: &[u8]) {
        self.metrics.value_decoded(bytes.len() as u64);
    }

    fn decode_failed(&self, _error: &DecodeError, _bytes: &[u8]) {
        self.metrics.decode_error();
    }

    fn call_sent(&self, _method: &str, _body: &[u8]) {
        self.metrics.call_sent();
    }

    fn fault(&self, _code: &str, _message: &str) {
        self.metrics.fault();
    }
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
