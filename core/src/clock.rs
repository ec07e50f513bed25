//! Engine clock — the single source of "now".
//!
//! RULE: Nothing in scoring, triage, or the timeline reads the wall clock.
//! Pure functions take `now` as an argument; the engine façade reads it
//! once per operation from an injected `Clock`, so every bill in a batch
//! is evaluated against the same instant.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Shared clocks, so a test can hold a handle while the engine owns another.
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall-clock time. Used by the runner when no `--now` is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant: Mutex::new(instant) }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = instant;
        }
    }

    /// Move forward by whole days. Returns the new instant.
    pub fn advance_days(&self, days: i64) -> DateTime<Utc> {
        match self.instant.lock() {
            Ok(mut guard) => {
                *guard = add_days(*guard, days);
                *guard
            }
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Whole days from `from` to `to`, negative when `to` is in the past.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days()
}

/// Day offsets read from bill data are clamped to about a century.
pub const MAX_OFFSET_DAYS: i64 = 36_500;

/// `at` moved by whole days. The offset is clamped to ±`MAX_OFFSET_DAYS`
/// and the result saturates at chrono's range, so bad data cannot panic.
pub fn add_days(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let days = days.clamp(-MAX_OFFSET_DAYS, MAX_OFFSET_DAYS);
    match at.checked_add_signed(Duration::days(days)) {
        Some(moved) => moved,
        None if days < 0 => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}
