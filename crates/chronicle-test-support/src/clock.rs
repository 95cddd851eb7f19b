//! Test clock — deterministic `Clock` implementation for tests.

use chrono::{DateTime, Utc};
use chronicle_core::clock::Clock;

/// A clock that always returns a fixed point in time.
///
/// Repositories seeded from it still issue strictly increasing tokens; they
/// just start from the same value on every run.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
