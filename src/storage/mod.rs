/// Storage layer for persisting tracker data
///
/// This module handles all database operations using SQLite. It stores
/// habits and their entries, dated task rows, focus sessions and the
/// shared slots that carry cross-process state such as running timers.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{
    FocusedSession, Habit, HabitEntry, HabitId, RepeatGroupId, Task, TaskEdit, TaskId,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Trait defining the storage interface for habits and tasks
///
/// The tools are generic over this trait so tests can run them against an
/// in-memory database.
pub trait TrackerStorage {
    /// Create a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Get a habit by ID
    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// Update an existing habit (the creation day is never rewritten)
    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Delete a habit together with all of its entries
    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError>;

    /// List habits, optionally restricted to one group label
    fn list_habits(&self, group: Option<&str>) -> Result<Vec<Habit>, StorageError>;

    /// Insert or replace the entry for the entry's (habit, date)
    fn upsert_entry(&self, entry: &HabitEntry) -> Result<(), StorageError>;

    /// Entry for a habit on one day, if any
    fn get_entry(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<HabitEntry>, StorageError>;

    /// All entries for a habit, oldest first
    fn get_entries_for_habit(&self, habit_id: &HabitId) -> Result<Vec<HabitEntry>, StorageError>;

    /// Entries for a habit within an inclusive date range
    fn get_entries_in_range(
        &self,
        habit_id: &HabitId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitEntry>, StorageError>;

    /// Store a single task row
    fn create_task(&self, task: &Task) -> Result<(), StorageError>;

    /// Store every row of a series in one transaction
    fn create_tasks(&self, tasks: &[Task]) -> Result<(), StorageError>;

    fn get_task(&self, task_id: &TaskId) -> Result<Task, StorageError>;

    fn update_task(&self, task: &Task) -> Result<(), StorageError>;

    fn delete_task(&self, task_id: &TaskId) -> Result<(), StorageError>;

    /// Tasks dated within an inclusive range, ordered by date then creation
    fn list_tasks_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, StorageError>;

    /// Every row of a repeat group, ordered by date
    fn list_tasks_by_group(&self, group_id: &RepeatGroupId) -> Result<Vec<Task>, StorageError>;

    /// Apply a series edit to every non-completed row of a group
    ///
    /// Returns the number of rows rewritten.
    fn update_group(&self, group_id: &RepeatGroupId, edit: &TaskEdit) -> Result<usize, StorageError>;

    /// Delete every non-completed row of a group, returning how many went
    fn delete_group_pending(&self, group_id: &RepeatGroupId) -> Result<usize, StorageError>;

    /// Write the same focused time to every row of a group
    fn set_group_focused_time(&self, group_id: &RepeatGroupId, seconds: f64) -> Result<usize, StorageError>;

    fn log_focused_session(&self, session: &FocusedSession) -> Result<(), StorageError>;

    /// Sessions dated within an inclusive range
    fn sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<FocusedSession>, StorageError>;
}

/// A named value visible to every process sharing the database
///
/// Each write bumps the slot's revision so observers can notice changes
/// made elsewhere without comparing contents.
pub trait SharedSlotStore {
    /// Current value of a slot, `None` when it was never written
    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot and return its new revision
    fn write_slot(&self, key: &str, value: &str) -> Result<u64, StorageError>;

    /// Revision of a slot, 0 when it was never written
    fn slot_revision(&self, key: &str) -> Result<u64, StorageError>;
}
