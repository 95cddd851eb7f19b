//! Clock abstractions for ordering-token generation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::event::EventTime;

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues strictly increasing [`EventTime`] tokens.
///
/// Each token is the wall-clock time in microseconds, bumped to one past the
/// previously issued token whenever the wall clock has not moved forward.
/// Ordering is guaranteed only for tokens issued by the same `TokenClock`;
/// across processes it is as good as the hosts' clocks.
pub struct TokenClock {
    wall: Arc<dyn Clock>,
    last: AtomicU64,
}

impl TokenClock {
    /// Creates a token clock reading wall time from `wall`.
    #[must_use]
    pub fn new(wall: Arc<dyn Clock>) -> Self {
        Self {
            wall,
            last: AtomicU64::new(EventTime::MIN.as_raw()),
        }
    }

    /// Returns the next token.
    pub fn next_token(&self) -> EventTime {
        let wall_micros = u64::try_from(self.wall.now().timestamp_micros()).unwrap_or(0);
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            // MAX is reserved as the upper sentinel.
            let candidate = wall_micros.max(current + 1).min(u64::MAX - 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return EventTime::from_raw(candidate),
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns the most recently issued token, or `EventTime::MIN` if none.
    #[must_use]
    pub fn last(&self) -> EventTime {
        EventTime::from_raw(self.last.load(Ordering::Acquire))
    }
}

impl Default for TokenClock {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for TokenClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClock")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}
