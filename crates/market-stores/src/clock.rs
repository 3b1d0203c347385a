use chrono::{DateTime, Datelike, Utc};
use std::sync::{Arc, Mutex};

/// Source of wall-clock time for timestamps and the monthly rollover.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar month counter: `year * 12 + month0`.
    fn month_index(&self) -> u32 {
        month_index_of(&self.now())
    }
}

pub fn month_index_of(at: &DateTime<Utc>) -> u32 {
    let year = at.year().max(0) as u32;
    year * 12 + at.month0()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and simulations. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    month_override: Arc<Mutex<Option<u32>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            month_override: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }

    /// Pin `month_index` to a raw value regardless of `now`.
    pub fn set_month_index(&self, month: u32) {
        if let Ok(mut guard) = self.month_override.lock() {
            *guard = Some(month);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|guard| *guard).unwrap_or_else(|_| Utc::now())
    }

    fn month_index(&self) -> u32 {
        let pinned = self.month_override.lock().ok().and_then(|guard| *guard);
        pinned.unwrap_or_else(|| month_index_of(&self.now()))
    }
}
