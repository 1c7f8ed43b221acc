use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Clock
///
/// Source of "today" for every date-dependent rule (plan start dates, `is_active`).
/// Handlers read it from the application state instead of calling the wall clock.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// SystemClock
///
/// Production clock: the current UTC calendar date.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// FixedClock
///
/// Always reports the same date. Used by tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub type ClockState = Arc<dyn Clock>;
