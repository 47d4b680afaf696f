use chrono::{Datelike, NaiveDate};
use zenith_tracker_mcp::date::{days_inclusive, end_of_year, parse_date};
use zenith_tracker_mcp::{generate, is_trackable, RepeatRule};

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

#[test]
fn test_daily_is_trackable_every_day_of_a_leap_year() {
    assert!(days_inclusive(d("2024-01-01"), d("2024-12-31")).all(|day| is_trackable(day, &RepeatRule::Daily)));
}

#[test]
fn test_weekly_generation_only_hits_selected_weekdays() {
    let dates = generate(d("2024-01-01"), &RepeatRule::weekly([1, 3, 5]), d("2024-01-31"));

    assert_eq!(dates.len(), 14);
    for date in &dates {
        let weekday = date.weekday().num_days_from_sunday();
        assert!([1, 3, 5].contains(&weekday), "{} is not Mon/Wed/Fri", date);
    }
}

#[test]
fn test_every_month_clamps_to_short_months() {
    let dates = generate(d("2024-01-31"), &RepeatRule::EveryMonth, end_of_year(d("2024-01-31")));

    for expected in ["2024-01-31", "2024-02-29", "2024-03-31", "2024-04-30", "2024-05-31"] {
        assert!(dates.contains(&d(expected)), "missing {}", expected);
    }
    assert_eq!(dates.len(), 12);
}

#[test]
fn test_monthly_first_and_last_in_april() {
    let dates = generate(d("2024-01-01"), &RepeatRule::monthly([1, 31]), d("2024-12-31"));

    let april: Vec<_> = dates.iter().filter(|date| date.month() == 4).collect();
    assert_eq!(april, vec![&d("2024-04-30")]);
    assert!(dates.contains(&d("2024-05-01")));
    assert!(dates.contains(&d("2024-05-31")));
}

#[test]
fn test_generation_is_ascending_and_unique() {
    let rules = [
        RepeatRule::Daily,
        RepeatRule::EveryWeek,
        RepeatRule::EveryMonth,
        RepeatRule::weekly([0, 2, 4, 6]),
        RepeatRule::monthly([5, 15, 30]),
    ];
    for rule in &rules {
        let dates = generate(d("2024-02-10"), rule, d("2024-12-31"));
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]), "{} out of order", rule);
        assert!(dates.iter().all(|date| *date >= d("2024-02-10")));
    }
}

#[test]
fn test_degenerate_rules_produce_nothing() {
    let horizon = d("2024-12-31");
    assert!(generate(d("2024-06-01"), &RepeatRule::None, horizon).is_empty());
    assert!(generate(d("2024-06-01"), &RepeatRule::weekly([]), horizon).is_empty());
    assert!(generate(d("2024-06-01"), &RepeatRule::monthly([0, 40]), horizon).is_empty());
    assert!(generate(d("2025-01-01"), &RepeatRule::Daily, horizon).is_empty());
}
