//! In-process adapter counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between the handle, the worker and the transport callback
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    /// Work items waiting in the queue
    queue_len: AtomicUsize,
    /// Commands executed by the worker
    command_count: AtomicU64,
    /// Indications decoded
    indication_count: AtomicU64,
    /// Transport events that arrived after the worker stopped
    dropped_events: AtomicU64,
    /// Synchronous requests that did not end in success
    sync_failures: AtomicU64,
    /// Requests queued for replay after an engine-busy response
    busy_replays_queued: AtomicU64,
    /// Replays sent when the engine turned off
    busy_replays_sent: AtomicU64,
    /// Replays the transport refused to send
    busy_replays_failed: AtomicU64,
    /// Raw and processed measurement sets delivered to the engine
    measurement_sets: AtomicU64,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn command_count(&self) -> u64 {
        self.command_count.load(Ordering::Relaxed)
    }

    pub fn inc_command_count(&self) {
        self.command_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn indication_count(&self) -> u64 {
        self.indication_count.load(Ordering::Relaxed)
    }

    pub fn inc_indication_count(&self) {
        self.indication_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_events(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sync_failures(&self) -> u64 {
        self.sync_failures.load(Ordering::Relaxed)
    }

    pub fn inc_sync_failures(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn busy_replays_queued(&self) -> u64 {
        self.busy_replays_queued.load(Ordering::Relaxed)
    }

    pub fn inc_busy_replays_queued(&self) {
        self.busy_replays_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn busy_replays_sent(&self) -> u64 {
        self.busy_replays_sent.load(Ordering::Relaxed)
    }

    pub fn add_busy_replays_sent(&self, count: u64) {
        self.busy_replays_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn busy_replays_failed(&self) -> u64 {
        self.busy_replays_failed.load(Ordering::Relaxed)
    }

    pub fn add_busy_replays_failed(&self, count: u64) {
        self.busy_replays_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn measurement_sets(&self) -> u64 {
        self.measurement_sets.load(Ordering::Relaxed)
    }

    pub fn inc_measurement_sets(&self) {
        self.measurement_sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            command_count: self.command_count(),
            indication_count: self.indication_count(),
            dropped_events: self.dropped_events(),
            sync_failures: self.sync_failures(),
            busy_replays_queued: self.busy_replays_queued(),
            busy_replays_sent: self.busy_replays_sent(),
            busy_replays_failed: self.busy_replays_failed(),
            measurement_sets: self.measurement_sets(),
        }
    }
}

/// Point-in-time copy of [`AdapterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub command_count: u64,
    pub indication_count: u64,
    pub dropped_events: u64,
    pub sync_failures: u64,
    pub busy_replays_queued: u64,
    pub busy_replays_sent: u64,
    pub busy_replays_failed: u64,
    pub measurement_sets: u64,
}
