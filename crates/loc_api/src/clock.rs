//! Boot-clock and wall-clock readings used to timestamp reports

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

static BOOT: OnceLock<Instant> = OnceLock::new();

/// Monotonic time since the first reading in this process
pub fn boot_time() -> Duration {
    BOOT.get_or_init(Instant::now).elapsed()
}

/// Milliseconds since the first reading in this process
pub fn uptime_ms() -> u64 {
    u64::try_from(boot_time().as_millis()).unwrap_or(u64::MAX)
}

/// Current UTC time in milliseconds; 0 if the clock is before the epoch
pub fn now_utc_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_time_is_monotonic() {
        let a = boot_time();
        let b = boot_time();
        assert!(b >= a);
        assert!(uptime_ms() >= u64::try_from(a.as_millis()).unwrap());
    }

    #[test]
    fn test_utc_after_2020() {
        assert!(now_utc_ms() > 1_577_836_800_000);
    }
}
