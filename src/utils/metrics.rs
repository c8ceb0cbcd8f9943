//! Observability and Metrics
//!
//! Counters for frames sealed and opened by sessions and the stream codec.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for codec operations
#[derive(Debug)]
pub struct Metrics {
    /// Frames encrypted and finalised for sending
    pub frames_sealed: AtomicU64,
    /// Frames that passed checksum and decryption
    pub frames_opened: AtomicU64,
    /// Total bytes of sealed frames
    pub bytes_sealed: AtomicU64,
    /// Total bytes of opened frames
    pub bytes_opened: AtomicU64,
    /// Frames split off a byte stream by the codec
    pub frames_decoded: AtomicU64,
    /// Frames rejected for a checksum mismatch
    pub checksum_failures: AtomicU64,
    /// Frames rejected by the cipher
    pub cipher_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            frames_sealed: AtomicU64::new(0),
            frames_opened: AtomicU64::new(0),
            bytes_sealed: AtomicU64::new(0),
            bytes_opened: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            checksum_failures: AtomicU64::new(0),
            cipher_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a sealed frame
    pub fn frame_sealed(&self, byte_count: u64) {
        self.frames_sealed.fetch_add(1, Ordering::Relaxed);
        self.bytes_sealed.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record an opened frame
    pub fn frame_opened(&self, byte_count: u64) {
        self.frames_opened.fetch_add(1, Ordering::Relaxed);
        self.bytes_opened.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a frame split off a stream
    pub fn frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cipher_failure(&self) {
        self.cipher_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sealed: self.frames_sealed.load(Ordering::Relaxed),
            frames_opened: self.frames_opened.load(Ordering::Relaxed),
            bytes_sealed: self.bytes_sealed.load(Ordering::Relaxed),
            bytes_opened: self.bytes_opened.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            cipher_failures: self.cipher_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            frames_sealed = snapshot.frames_sealed,
            frames_opened = snapshot.frames_opened,
            bytes_sealed = snapshot.bytes_sealed,
            bytes_opened = snapshot.bytes_opened,
            frames_decoded = snapshot.frames_decoded,
            checksum_failures = snapshot.checksum_failures,
            cipher_failures = snapshot.cipher_failures,
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
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub frames_sealed: u64,
    pub frames_opened: u64,
    pub bytes_sealed: u64,
    pub bytes_opened: u64,
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub cipher_failures: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
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
