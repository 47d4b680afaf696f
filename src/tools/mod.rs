/// MCP tools for habits, tasks and focus timers
///
/// This module contains all the MCP tools that external clients can call
/// to interact with the tracker. Each tool is a plain function over the
/// storage traits; "today" is always passed in by the caller.

pub mod habit;
pub mod task;
pub mod timer;
pub mod focus;

// Re-export tool functions for easy access
pub use habit::*;
pub use task::*;
pub use timer::*;
pub use focus::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::date::parse_date;
use crate::domain::{DomainError, HabitId, TaskId};
use crate::storage::StorageError;

/// Errors a tool call can fail with
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::InvalidArgument("Habit ID cannot be empty".to_string()));
    }
    HabitId::from_string(raw)
        .map_err(|_| ToolError::InvalidArgument(format!("'{}' is not a valid habit ID", raw)))
}

pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::InvalidArgument("Task ID cannot be empty".to_string()));
    }
    TaskId::from_string(raw)
        .map_err(|_| ToolError::InvalidArgument(format!("'{}' is not a valid task ID", raw)))
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to `today`
pub(crate) fn date_or_today(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ToolError> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(parse_date(s)?),
        _ => Ok(today),
    }
}

/// Pluralize a unit for messages ("1 day", "3 days")
pub(crate) fn plural(count: impl Into<u64>, unit: &str) -> String {
    let count = count.into();
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}
