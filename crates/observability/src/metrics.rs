//! Adapter metric helpers
//!
//! Thin wrappers over the `metrics` facade; no-ops until a recorder is installed.

use contracts::{IndicationKind, MessageId};
use metrics::{counter, gauge, histogram};

/// Count a decoded indication
pub fn record_indication(kind: IndicationKind) {
    counter!(
        "loc_api_indications_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Count a synchronous request and record its latency
///
/// `outcome`: success / failure / busy / timeout / transport_error
pub fn record_sync_request(id: MessageId, outcome: &'static str, latency_ms: f64) {
    counter!(
        "loc_api_sync_requests_total",
        "message" => format!("{id:?}"),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("loc_api_sync_latency_ms").record(latency_ms);
}

/// Count a request queued for replay
pub fn record_busy_replay_queued(id: MessageId) {
    counter!(
        "loc_api_busy_replays_queued_total",
        "message" => format!("{id:?}")
    )
    .increment(1);
}

/// Count replays sent and refused when the queue drains
pub fn record_busy_replays_drained(sent: usize, failed: usize) {
    counter!("loc_api_busy_replays_drained_total").increment(sent as u64);
    counter!("loc_api_busy_replays_failed_total").increment(failed as u64);
}

/// Count a measurement set handed to the engine
///
/// `kind`: raw / processed
pub fn record_measurement_flushed(kind: &'static str, satellites: usize) {
    counter!("loc_api_measurement_sets_total", "kind" => kind).increment(1);
    histogram!("loc_api_measurement_set_size", "kind" => kind).record(satellites as f64);
}

pub fn record_xtra_bytes_injected(bytes: usize) {
    counter!("loc_api_xtra_bytes_injected_total").increment(bytes as u64);
}

/// Native event mask currently registered
pub fn record_registered_mask(bits: u64) {
    gauge!("loc_api_registered_event_mask").set(bits as f64);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("loc_api_command_queue_depth").set(depth as f64);
}

/// Snapshot of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut stats = RunningStats::default();
        assert_eq!(stats.summary().to_string(), "N/A");

        stats.push(10.0);
        stats.push(30.0);
        let output = stats.summary().to_string();
        assert!(output.contains("min=10.000"));
        assert!(output.contains("n=2"));
    }

    #[test]
    fn test_record_without_recorder() {
        // No global recorder installed: calls are no-ops
        record_indication(IndicationKind::Nmea);
        record_sync_request(MessageId::Start, "success", 1.5);
        record_busy_replays_drained(0, 0);
    }
}
