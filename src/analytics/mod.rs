/// Focus analytics over logged sessions
///
/// This module sums focused-session durations into the daily, weekly and
/// monthly figures shown by the focus overview.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::date::{add_days, end_of_month, format_date, start_of_month, start_of_week};
use crate::domain::FocusedSession;

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Minutes focused on one day of the week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayMinutes {
    pub label: &'static str,
    pub date: NaiveDate,
    /// Rounded to whole minutes
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekFocus {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_seconds: f64,
    pub days: Vec<DayMinutes>,
    /// Mean of the seven daily minute figures
    pub average_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusOverview {
    pub date: NaiveDate,
    pub day_seconds: f64,
    pub week: WeekFocus,
    pub month_start: NaiveDate,
    pub month_seconds: f64,
}

/// Date range whose sessions [`FocusOverview::compute`] needs
///
/// The week around `date` can spill into the neighbouring months.
pub fn overview_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week_start = start_of_week(date);
    let week_end = add_days(week_start, 6);
    (
        week_start.min(start_of_month(date)),
        week_end.max(end_of_month(date)),
    )
}

fn total_between(sessions: &[FocusedSession], start: NaiveDate, end: NaiveDate) -> f64 {
    sessions
        .iter()
        .filter(|s| s.date >= start && s.date <= end)
        .map(|s| s.duration)
        .sum()
}

impl FocusOverview {
    /// Summarize `sessions` around `date`; sessions outside the range are ignored
    pub fn compute(sessions: &[FocusedSession], date: NaiveDate) -> Self {
        let week_start = start_of_week(date);
        let week_end = add_days(week_start, 6);

        let days: Vec<DayMinutes> = WEEKDAY_LABELS
            .iter()
            .enumerate()
            .map(|(offset, label)| {
                let day = add_days(week_start, offset as i64);
                DayMinutes {
                    label: *label,
                    date: day,
                    minutes: (total_between(sessions, day, day) / 60.0).round() as u32,
                }
            })
            .collect();
        let average_minutes = days.iter().map(|d| d.minutes as f64).sum::<f64>() / days.len() as f64;

        let month_start = start_of_month(date);

        Self {
            date,
            day_seconds: total_between(sessions, date, date),
            week: WeekFocus {
                start: week_start,
                end: week_end,
                total_seconds: total_between(sessions, week_start, week_end),
                days,
                average_minutes,
            },
            month_start,
            month_seconds: total_between(sessions, month_start, end_of_month(date)),
        }
    }

    /// Plain-text report
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("⏱️ Focus overview for {}", format_date(self.date)),
            format!("Today: {}", format_focus_time(self.day_seconds)),
            format!(
                "Week {} to {}: {} (avg {}m/day)",
                format_date(self.week.start),
                format_date(self.week.end),
                format_focus_time(self.week.total_seconds),
                self.week.average_minutes.round() as u64
            ),
        ];
        for day in &self.week.days {
            lines.push(format!("   {} {}: {} min", day.label, format_date(day.date), day.minutes));
        }
        lines.push(format!(
            "Month of {}: {}",
            self.month_start.format("%B %Y"),
            format_focus_time(self.month_seconds)
        ));
        lines.join("\n")
    }
}

/// "N min" under an hour, "X.Y hr" from an hour up
pub fn format_focus_time(seconds: f64) -> String {
    if seconds < 3600.0 {
        format!("{} min", (seconds.max(0.0) / 60.0).round() as u64)
    } else {
        format!("{:.1} hr", seconds / 3600.0)
    }
}
