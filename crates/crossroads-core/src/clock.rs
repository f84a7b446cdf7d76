//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns a fresh adventure id: the current Unix time in milliseconds,
    /// rendered as a decimal string.
    fn adventure_id(&self) -> String {
        self.now().timestamp_millis().to_string()
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Frozen;

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
        }
    }

    #[test]
    fn test_adventure_id_is_millisecond_timestamp() {
        assert_eq!(Frozen.adventure_id(), "1768471200000");
    }
}
