//! Source of "now" for timers and "today" for calendar logic

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// Wall-clock milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;

    /// The user's local calendar day
    fn today(&self) -> NaiveDate;

    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_millis()).unwrap_or_default()
    }
}

/// The real clock; "today" follows the machine's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to
///
/// "Today" is the UTC day of the current instant.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Noon UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc();
        Self::new(noon)
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::date::parse_date;

    #[test]
    fn test_manual_clock_rolls_over_midnight() {
        let clock = ManualClock::on(parse_date("2024-05-31").unwrap());
        assert_eq!(clock.today(), parse_date("2024-05-31").unwrap());

        clock.advance_secs(11 * 3600);
        assert_eq!(clock.today(), parse_date("2024-05-31").unwrap());
        clock.advance_secs(3600);
        assert_eq!(clock.today(), parse_date("2024-06-01").unwrap());
    }
}
