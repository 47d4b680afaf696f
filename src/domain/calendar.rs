//! Month grid for a habit
//!
//! Produces one cell per day of a month, flagging which days are expected
//! and which can still be logged.

use serde::Serialize;
use chrono::NaiveDate;

use crate::domain::date::{days_inclusive, end_of_month, start_of_month, weekday_index};
use crate::domain::trackability::is_trackable;
use crate::domain::{Habit, HabitEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub trackable: bool,
    pub future: bool,
    pub before_creation: bool,
    /// Trackable, not in the future and not before the habit existed
    pub loggable: bool,
    pub completed: Option<bool>,
    pub count: Option<u32>,
    pub qualifies: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid {
    pub month_start: NaiveDate,
    /// Blank cells before the 1st in a Sunday-first layout
    pub leading_blanks: u8,
    pub cells: Vec<CalendarCell>,
}

/// Whether an entry may be recorded for `habit` on `date`
pub fn is_loggable(habit: &Habit, date: NaiveDate, today: NaiveDate) -> bool {
    is_trackable(date, &habit.rule) && date <= today && date >= habit.created_on()
}

/// Build the grid for the month containing `month`
pub fn month_grid(habit: &Habit, entries: &[HabitEntry], month: NaiveDate, today: NaiveDate) -> MonthGrid {
    let month_start = start_of_month(month);

    let cells = days_inclusive(month_start, end_of_month(month))
        .map(|date| {
            let entry = entries.iter().find(|e| e.date == date);
            CalendarCell {
                date,
                trackable: is_trackable(date, &habit.rule),
                future: date > today,
                before_creation: date < habit.created_on(),
                loggable: is_loggable(habit, date, today),
                completed: entry.and_then(|e| e.completed),
                count: entry.and_then(|e| e.count),
                qualifies: entry.map(|e| e.qualifies(&habit.kind)).unwrap_or(false),
            }
        })
        .collect();

    MonthGrid {
        month_start,
        leading_blanks: weekday_index(month_start),
        cells,
    }
}
