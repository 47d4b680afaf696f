//! Habit trackability
//!
//! Decides whether a habit expects an occurrence on a given day, without
//! consulting any generated date list.

use chrono::NaiveDate;

use crate::domain::date::{day_of_month, weekday_index};
use crate::domain::RepeatRule;

/// Whether `date` is an expected occurrence for a habit repeating by `rule`
///
/// Monthly rules match the literal day of month with no short-month
/// clamping, so a habit on the 31st is only due in 31-day months. Task
/// generation clamps instead.
/// Habits only use daily/weekly/monthly rules, everything else is never due.
pub fn is_trackable(date: NaiveDate, rule: &RepeatRule) -> bool {
    match rule {
        RepeatRule::Daily => true,
        RepeatRule::Weekly { days_of_week } => days_of_week.contains(&weekday_index(date)),
        RepeatRule::Monthly { days_of_month } => days_of_month.contains(&day_of_month(date)),
        RepeatRule::None | RepeatRule::EveryWeek | RepeatRule::EveryMonth => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::date::{days_inclusive, parse_date};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_daily_always_trackable() {
        for day in days_inclusive(d("2024-01-01"), d("2024-12-31")) {
            assert!(is_trackable(day, &RepeatRule::Daily));
        }
    }

    #[test]
    fn test_weekly_matches_weekdays() {
        let rule = RepeatRule::weekly([0, 6]);
        assert!(is_trackable(d("2024-01-06"), &rule)); // Saturday
        assert!(is_trackable(d("2024-01-07"), &rule)); // Sunday
        assert!(!is_trackable(d("2024-01-08"), &rule));
    }

    #[test]
    fn test_monthly_does_not_clamp() {
        let rule = RepeatRule::monthly([31]);
        assert!(is_trackable(d("2024-01-31"), &rule));
        assert!(!is_trackable(d("2024-04-30"), &rule));
        assert!(!is_trackable(d("2024-02-29"), &rule));
    }

    #[test]
    fn test_task_only_rules_never_trackable() {
        let day = d("2024-01-01");
        assert!(!is_trackable(day, &RepeatRule::None));
        assert!(!is_trackable(day, &RepeatRule::EveryWeek));
        assert!(!is_trackable(day, &RepeatRule::EveryMonth));
        assert!(!is_trackable(day, &RepeatRule::weekly([])));
        assert!(!is_trackable(day, &RepeatRule::monthly([])));
    }
}
