//! Streak and completion statistics
//!
//! This module derives a habit's statistics from its sparse set of dated
//! entries. Only days the habit's rule marks as trackable can break a
//! streak or count towards the totals.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::domain::date::{add_days, days_between, days_inclusive};
use crate::domain::trackability::is_trackable;
use crate::domain::{DatedEntry, RepeatRule};

/// Calculated statistics for a habit as of a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HabitStats {
    /// Trackable days from creation through today
    pub total_instances: u32,
    /// Trackable days that have a qualifying entry
    pub done_instances: u32,
    /// Consecutive trackable occurrences completed up to today
    pub current_streak: u32,
    /// Calendar days since creation, today included, never below 1
    pub active_days: u32,
}

impl HabitStats {
    /// Share of trackable days that were done (0.0 to 1.0)
    pub fn completion_rate(&self) -> f64 {
        if self.total_instances == 0 {
            return 0.0;
        }
        self.done_instances as f64 / self.total_instances as f64
    }

    /// Get a motivational message based on current streak status
    pub fn motivational_message(&self) -> String {
        match self.current_streak {
            0 => "Ready to start your streak! Every journey begins with a single step.".to_string(),
            1 => "Great start! One down, keep the momentum going.".to_string(),
            2..=6 => format!("Nice work! {} in a row. You're building a strong habit.", self.current_streak),
            7..=29 => format!("Excellent! {} in a row. You're in the groove now!", self.current_streak),
            _ => format!("Incredible! {} in a row. This is second nature now.", self.current_streak),
        }
    }
}

/// Compute statistics for a habit
///
/// `entries` may be in any order and may include non-qualifying entries or
/// entries from before `created_on`; both are ignored where appropriate.
pub fn compute_stats(
    rule: &RepeatRule,
    created_on: NaiveDate,
    entries: &[DatedEntry],
    today: NaiveDate,
) -> HabitStats {
    let (total_instances, done_instances) = count_instances(rule, created_on, entries, today);
    let current_streak = current_streak(rule, created_on, entries, today);
    let active_days = (days_between(created_on, today) + 1).max(1) as u32;

    HabitStats {
        total_instances,
        done_instances,
        current_streak,
        active_days,
    }
}

/// Trackable and done days from creation (or today, if created later) to today
fn count_instances(
    rule: &RepeatRule,
    created_on: NaiveDate,
    entries: &[DatedEntry],
    today: NaiveDate,
) -> (u32, u32) {
    let start = created_on.min(today);
    let mut total = 0;
    let mut done = 0;

    for day in days_inclusive(start, today) {
        if !is_trackable(day, rule) {
            continue;
        }
        total += 1;
        if entries.iter().any(|e| e.date == day && e.qualifies) {
            done += 1;
        }
    }

    (total, done)
}

/// Current streak ending at the most recent qualifying entry
///
/// Any unmet trackable day between that entry and today breaks the streak,
/// today included: a daily habit shows 0 until today is marked done.
fn current_streak(
    rule: &RepeatRule,
    created_on: NaiveDate,
    entries: &[DatedEntry],
    today: NaiveDate,
) -> u32 {
    let mut done_dates: Vec<NaiveDate> = entries
        .iter()
        .filter(|e| e.qualifies && e.date >= created_on)
        .map(|e| e.date)
        .collect();
    done_dates.sort_unstable_by(|a, b| b.cmp(a));
    done_dates.dedup();

    let Some(&last_done) = done_dates.first() else {
        return 0;
    };

    // Walk back from today (inclusive) to the day after the last completion
    let gap = days_between(last_done, today);
    let mut probe = today;
    for _ in 0..gap.max(0) {
        if is_trackable(probe, rule) {
            return 0;
        }
        probe = add_days(probe, -1);
    }

    let mut streak = 1;
    let mut anchor = last_done;

    for &entry_date in &done_dates[1..] {
        let mut probe = add_days(anchor, -1);
        let mut broken = false;

        while probe >= entry_date {
            if is_trackable(probe, rule) {
                broken = probe != entry_date;
                break;
            }
            probe = add_days(probe, -1);
        }

        if broken {
            break;
        }
        streak += 1;
        anchor = entry_date;
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::date::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn done(dates: &[&str]) -> Vec<DatedEntry> {
        dates
            .iter()
            .map(|s| DatedEntry { date: d(s), qualifies: true })
            .collect()
    }

    #[test]
    fn test_no_entries() {
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &[], d("2024-01-03"));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.total_instances, 3);
        assert_eq!(stats.done_instances, 0);
        assert_eq!(stats.active_days, 3);
        assert_eq!(stats.completion_rate(), 0.0);
    }

    #[test]
    fn test_daily_streak_through_today() {
        let entries = done(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-03"));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.done_instances, 3);
        assert_eq!(stats.completion_rate(), 1.0);
    }

    #[test]
    fn test_daily_gap_in_history_stops_streak() {
        let entries = done(&["2024-01-01", "2024-01-03", "2024-01-04"]);
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-04"));
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn test_weekly_streak_skips_untracked_days() {
        // Mondays and Thursdays; 2024-01-01 is a Monday
        let rule = RepeatRule::weekly([1, 4]);
        let entries = done(&["2024-01-01", "2024-01-04", "2024-01-08"]);

        // Tuesday after the last Monday: nothing trackable since, streak holds
        let stats = compute_stats(&rule, d("2024-01-01"), &entries, d("2024-01-09"));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.total_instances, 3);

        // Thursday the 11th is trackable and not done
        let stats = compute_stats(&rule, d("2024-01-01"), &entries, d("2024-01-11"));
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn test_entry_on_untracked_day_extends_streak() {
        // Mondays only; a Sunday entry sits between two Mondays
        let rule = RepeatRule::weekly([1]);
        let entries = done(&["2024-01-01", "2024-01-07", "2024-01-08"]);
        let stats = compute_stats(&rule, d("2024-01-01"), &entries, d("2024-01-08"));
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn test_entries_before_creation_ignored() {
        let entries = done(&["2023-12-30", "2023-12-31", "2024-01-01"]);
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-01"));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.total_instances, 1);
    }

    #[test]
    fn test_non_qualifying_entries_do_not_count() {
        let entries = vec![
            DatedEntry { date: d("2024-01-01"), qualifies: true },
            DatedEntry { date: d("2024-01-02"), qualifies: false },
        ];
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-02"));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.done_instances, 1);
    }

    #[test]
    fn test_creation_in_future_clamps() {
        let stats = compute_stats(&RepeatRule::Daily, d("2024-01-10"), &[], d("2024-01-05"));
        assert_eq!(stats.total_instances, 1);
        assert_eq!(stats.active_days, 1);
    }
}
