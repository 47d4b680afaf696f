//! Domain module containing the scheduling and accounting core
//!
//! This module defines the core entities (Habit, HabitEntry, Task) together
//! with the pure calendar logic: recurrence expansion, trackability and
//! streak statistics.

pub mod calendar;
pub mod date;
pub mod entry;
pub mod habit;
pub mod recurrence;
pub mod streak;
pub mod task;
pub mod trackability;
pub mod types;

// Re-export public types for easy access
pub use calendar::{is_loggable, month_grid, CalendarCell, MonthGrid};
pub use entry::*;
pub use habit::*;
pub use recurrence::generate;
pub use streak::{compute_stats, HabitStats};
pub use task::*;
pub use trackability::is_trackable;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid repeat rule: {0}")]
    InvalidRepeatRule(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}
