//! Wall-clock sources for bucket keys.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests
///
/// Clones share the same time, so a test can hold one handle while the
/// limiter owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
