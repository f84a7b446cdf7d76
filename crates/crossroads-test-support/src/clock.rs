//! Test clock: deterministic `Clock` implementation for tests.

use chrono::{DateTime, TimeZone, Utc};
use crossroads_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// The instant used across the test suites: 2026-01-15 10:00:00 UTC,
    /// which makes new adventure ids `"1768471200000"`.
    #[must_use]
    pub fn standard() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
