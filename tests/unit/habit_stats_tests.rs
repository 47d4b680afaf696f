use chrono::NaiveDate;
use zenith_tracker_mcp::date::parse_date;
use zenith_tracker_mcp::{compute_stats, DatedEntry, RepeatRule};

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
fn test_daily_streak_breaks_the_next_day() {
    let entries = done(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]);

    let on_the_day = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-05"));
    assert_eq!(on_the_day.current_streak, 5);

    let next_day = compute_stats(&RepeatRule::Daily, d("2024-01-01"), &entries, d("2024-01-06"));
    assert_eq!(next_day.current_streak, 0);
}

#[test]
fn test_weekend_habit_counts_only_weekends() {
    // 2024-01-01 is a Monday; the 6th and 7th are the only weekend days
    let rule = RepeatRule::weekly([0, 6]);
    let entries = done(&["2024-01-03", "2024-01-06"]);

    let stats = compute_stats(&rule, d("2024-01-01"), &entries, d("2024-01-10"));

    assert_eq!(stats.total_instances, 2);
    assert_eq!(stats.done_instances, 1);
    assert_eq!(stats.active_days, 10);
    assert_eq!(stats.completion_rate(), 0.5);
}

#[test]
fn test_non_qualifying_entries_are_ignored() {
    let entries = vec![
        DatedEntry { date: d("2024-03-01"), qualifies: true },
        DatedEntry { date: d("2024-03-02"), qualifies: false },
    ];

    let stats = compute_stats(&RepeatRule::Daily, d("2024-03-01"), &entries, d("2024-03-02"));

    assert_eq!(stats.done_instances, 1);
    assert_eq!(stats.current_streak, 0);
}

#[test]
fn test_monthly_streak_spans_months() {
    let rule = RepeatRule::monthly([15]);
    let entries = done(&["2024-01-15", "2024-02-15", "2024-03-15"]);

    let stats = compute_stats(&rule, d("2024-01-01"), &entries, d("2024-04-10"));

    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.total_instances, 3);
}
