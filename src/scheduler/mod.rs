use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;

/// How long to wait from `now` until the next wall-clock multiple of
/// `interval_secs`. Exactly on a boundary waits a full interval, so tick
/// times stay on the same snap points across restarts.
pub fn delay_until_boundary(now: DateTime<Utc>, interval_secs: u64) -> Duration {
    let into_interval = now.timestamp().rem_euclid(interval_secs as i64) as u64;
    Duration::from_secs(interval_secs - into_interval)
}

/// Whether this tick lands on the sampling rotation: an exact multiple of
/// `every_minutes`, within the first seconds of that minute. The window is
/// wide enough that a tick fired slightly late still samples, and narrow
/// enough that only one tick per rotation does.
pub fn is_sample_tick(now: DateTime<Utc>, every_minutes: u32) -> bool {
    now.minute() % every_minutes == 0 && now.second() < 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, h, m, s).unwrap()
    }

    #[test]
    fn test_boundary_delay_mid_interval() {
        assert_eq!(delay_until_boundary(at(10, 0, 1), 30), Duration::from_secs(29));
        assert_eq!(delay_until_boundary(at(10, 0, 29), 30), Duration::from_secs(1));
        assert_eq!(delay_until_boundary(at(10, 0, 45), 30), Duration::from_secs(15));
    }

    #[test]
    fn test_boundary_delay_on_exact_boundary_waits_full_interval() {
        assert_eq!(delay_until_boundary(at(10, 0, 0), 30), Duration::from_secs(30));
        assert_eq!(delay_until_boundary(at(10, 0, 30), 30), Duration::from_secs(30));
    }

    #[test]
    fn test_sample_tick_on_rotation() {
        assert!(is_sample_tick(at(10, 0, 0), 5));
        assert!(is_sample_tick(at(10, 5, 3), 5));
        assert!(is_sample_tick(at(10, 55, 9), 5));
    }

    #[test]
    fn test_sample_tick_off_rotation() {
        // Right multiple of five, too deep into the minute
        assert!(!is_sample_tick(at(10, 5, 30), 5));
        // Wrong minute entirely
        assert!(!is_sample_tick(at(10, 4, 5), 5));
        assert!(!is_sample_tick(at(10, 31, 0), 5));
    }
}
