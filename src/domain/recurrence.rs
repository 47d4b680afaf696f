//! Recurrence expansion
//!
//! Turns a repeat rule into the concrete dates a recurring task is
//! materialized on. The caller always supplies the horizon; task creation
//! uses the end of the anchor's calendar year.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::domain::date::{
    days_in_month, days_inclusive, next_month_start, start_of_month, weekday_index,
};
use crate::domain::RepeatRule;

/// Expand `rule` into ascending, duplicate-free dates in `anchor..=horizon`
///
/// Empty day sets and out-of-range configured days produce nothing rather
/// than an error.
pub fn generate(anchor: NaiveDate, rule: &RepeatRule, horizon: NaiveDate) -> Vec<NaiveDate> {
    if anchor > horizon {
        return Vec::new();
    }

    match rule {
        RepeatRule::None => Vec::new(),
        RepeatRule::Daily => days_inclusive(anchor, horizon).collect(),
        RepeatRule::EveryWeek => {
            let weekday = weekday_index(anchor);
            days_inclusive(anchor, horizon)
                .filter(|day| weekday_index(*day) == weekday)
                .collect()
        }
        RepeatRule::Weekly { days_of_week } => days_inclusive(anchor, horizon)
            .filter(|day| days_of_week.contains(&weekday_index(*day)))
            .collect(),
        RepeatRule::EveryMonth => every_month(anchor, horizon),
        RepeatRule::Monthly { days_of_month } => monthly(anchor, days_of_month, horizon),
    }
}

/// One date per month on the anchor's day, clamped to each month's length
fn every_month(anchor: NaiveDate, horizon: NaiveDate) -> Vec<NaiveDate> {
    let wanted = anchor.day();
    let mut dates = Vec::new();
    let mut month = start_of_month(anchor);

    while month <= horizon {
        let last = days_in_month(month.year(), month.month());
        let day = wanted.min(last);
        if let Some(date) = month.with_day(day) {
            if date >= anchor && date <= horizon {
                dates.push(date);
            }
        }
        month = next_month_start(month);
    }

    dates
}

/// Selected month days with the short-month adjustment
///
/// The adjustment is taken from the largest configured day and shifts every
/// configured day by the same amount. In a 30-day month `{1, 31}` therefore
/// yields only the 30th: day 1 shifts to 0 and is dropped for that month.
fn monthly(anchor: NaiveDate, days_of_month: &BTreeSet<u8>, horizon: NaiveDate) -> Vec<NaiveDate> {
    let days: Vec<u32> = days_of_month
        .iter()
        .copied()
        .filter(|day| (1..=31).contains(day))
        .map(u32::from)
        .collect();

    let Some(&max_day) = days.last() else {
        return Vec::new();
    };

    let mut dates = Vec::new();
    let mut month = start_of_month(anchor);

    while month <= horizon {
        let length = days_in_month(month.year(), month.month());
        let adjustment = max_day.saturating_sub(length);

        for &day in &days {
            if day <= adjustment {
                continue;
            }
            if let Some(date) = month.with_day(day - adjustment) {
                if date >= anchor && date <= horizon {
                    dates.push(date);
                }
            }
        }

        month = next_month_start(month);
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::date::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_none_is_empty() {
        assert!(generate(d("2024-01-01"), &RepeatRule::None, d("2024-12-31")).is_empty());
    }

    #[test]
    fn test_daily_includes_anchor_and_horizon() {
        let dates = generate(d("2024-12-29"), &RepeatRule::Daily, d("2024-12-31"));
        assert_eq!(dates, vec![d("2024-12-29"), d("2024-12-30"), d("2024-12-31")]);
    }

    #[test]
    fn test_every_week_keeps_anchor_weekday() {
        // 2024-01-03 is a Wednesday
        let dates = generate(d("2024-01-03"), &RepeatRule::EveryWeek, d("2024-01-31"));
        assert_eq!(
            dates,
            vec![d("2024-01-03"), d("2024-01-10"), d("2024-01-17"), d("2024-01-24"), d("2024-01-31")]
        );
    }

    #[test]
    fn test_every_month_clamps_per_month() {
        let dates = generate(d("2024-01-31"), &RepeatRule::EveryMonth, d("2024-06-30"));
        assert_eq!(
            dates,
            vec![
                d("2024-01-31"),
                d("2024-02-29"),
                d("2024-03-31"),
                d("2024-04-30"),
                d("2024-05-31"),
                d("2024-06-30"),
            ]
        );
    }

    #[test]
    fn test_monthly_skips_days_before_anchor() {
        let dates = generate(d("2024-03-15"), &RepeatRule::monthly([10, 20]), d("2024-04-30"));
        assert_eq!(dates, vec![d("2024-03-20"), d("2024-04-10"), d("2024-04-20")]);
    }

    #[test]
    fn test_monthly_shared_adjustment_in_february() {
        // max day 31 in a 29-day February shifts everything by 2
        let dates = generate(d("2024-02-01"), &RepeatRule::monthly([2, 15, 31]), d("2024-02-29"));
        assert_eq!(dates, vec![d("2024-02-13"), d("2024-02-29")]);
    }

    #[test]
    fn test_empty_day_sets_generate_nothing() {
        assert!(generate(d("2024-01-01"), &RepeatRule::weekly([]), d("2024-12-31")).is_empty());
        assert!(generate(d("2024-01-01"), &RepeatRule::monthly([]), d("2024-12-31")).is_empty());
    }

    #[test]
    fn test_out_of_range_days_are_ignored() {
        assert!(generate(d("2024-01-01"), &RepeatRule::weekly([7, 9]), d("2024-01-31")).is_empty());
        let dates = generate(d("2024-01-01"), &RepeatRule::monthly([0, 5, 40]), d("2024-02-29"));
        assert_eq!(dates, vec![d("2024-01-05"), d("2024-02-05")]);
    }

    #[test]
    fn test_anchor_after_horizon() {
        assert!(generate(d("2025-01-01"), &RepeatRule::Daily, d("2024-12-31")).is_empty());
    }
}
