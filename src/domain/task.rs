//! Task entity, series edits and focus sessions
//!
//! A recurring task is stored as one row per generated date. All rows of a
//! series share a repeat group id so edits and deletes can be applied to the
//! whole group while leaving completed rows alone.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use crate::domain::{
    DomainError, RepeatGroupId, RepeatRule, SessionId, TaskId, TaskScope, TimerMode,
};

/// A checklist item inside a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub name: String,
    pub completed: bool,
}

impl Subtask {
    pub fn new(id: String, name: String) -> Self {
        Self { id, name, completed: false }
    }
}

/// One dated task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub subtasks: Vec<Subtask>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// `None` when the task has no timer
    pub timer_mode: Option<TimerMode>,
    /// Countdown length in seconds (timer mode only)
    pub timer_duration: u32,
    /// Banked focus seconds of the current unsaved session
    pub focused_time: f64,
    pub rule: RepeatRule,
    pub repeat_group_id: Option<RepeatGroupId>,
    pub scope: TaskScope,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Series-level fields of a task, shared by every row of a repeat group
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEdit {
    pub name: String,
    pub subtasks: Vec<Subtask>,
    pub timer_mode: Option<TimerMode>,
    pub timer_duration: u32,
    pub rule: RepeatRule,
    pub scope: TaskScope,
}

impl TaskEdit {
    pub fn validate(&self) -> Result<(), DomainError> {
        Task::validate_name(&self.name)?;
        Task::validate_rule(&self.scope, &self.rule)?;
        Task::validate_timer(self.timer_mode, self.timer_duration)
    }

    /// Overwrite the series-level fields of one row
    pub fn apply_to(&self, task: &mut Task) {
        task.name = self.name.trim().to_string();
        task.subtasks = self.subtasks.clone();
        task.timer_mode = self.timer_mode;
        task.timer_duration = self.timer_duration;
        task.rule = self.rule.clone();
        task.scope = self.scope;
    }
}

impl Task {
    /// Build one row from a validated series definition
    pub fn from_edit(edit: &TaskEdit, date: NaiveDate, repeat_group_id: Option<RepeatGroupId>) -> Self {
        Self {
            id: TaskId::new(),
            name: edit.name.trim().to_string(),
            subtasks: edit.subtasks.clone(),
            completed: false,
            completed_at: None,
            timer_mode: edit.timer_mode,
            timer_duration: edit.timer_duration,
            focused_time: 0.0,
            rule: edit.rule.clone(),
            repeat_group_id,
            scope: edit.scope,
            date,
            created_at: Utc::now(),
        }
    }

    /// Snapshot of this row's series-level fields
    pub fn edit(&self) -> TaskEdit {
        TaskEdit {
            name: self.name.clone(),
            subtasks: self.subtasks.clone(),
            timer_mode: self.timer_mode,
            timer_duration: self.timer_duration,
            rule: self.rule.clone(),
            scope: self.scope,
        }
    }

    /// Flip completion, stamping or clearing the completion time
    pub fn toggle_complete(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }

    /// Flip one subtask; the task is complete exactly when all subtasks are
    pub fn toggle_subtask(&mut self, subtask_id: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        let subtask = self
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| DomainError::Validation {
                message: format!("Task has no subtask '{}'", subtask_id),
            })?;
        subtask.completed = !subtask.completed;

        self.completed = self.subtasks.iter().all(|s| s.completed);
        self.completed_at = if self.completed { Some(now) } else { None };
        Ok(())
    }

    /// Seconds shown on an idle timer
    pub fn idle_display_seconds(&self) -> f64 {
        match self.timer_mode {
            Some(TimerMode::Timer) => self.timer_duration as f64,
            Some(TimerMode::Stopwatch) => self.focused_time,
            None => 0.0,
        }
    }

    pub(crate) fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidName("Task name cannot be empty".to_string()));
        }
        if trimmed.len() > 200 {
            return Err(DomainError::InvalidName(
                "Task name cannot be longer than 200 characters".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn validate_rule(scope: &TaskScope, rule: &RepeatRule) -> Result<(), DomainError> {
        if scope.allows(rule) {
            Ok(())
        } else {
            Err(DomainError::InvalidRepeatRule(format!(
                "'{}' tasks cannot repeat '{}'",
                scope.as_str(),
                rule.label()
            )))
        }
    }

    pub(crate) fn validate_timer(mode: Option<TimerMode>, duration: u32) -> Result<(), DomainError> {
        if mode == Some(TimerMode::Timer) && duration == 0 {
            return Err(DomainError::InvalidValue {
                message: "Timer duration must be greater than 0".to_string(),
            });
        }
        if duration > 24 * 3600 {
            return Err(DomainError::InvalidValue {
                message: "Timer duration cannot exceed 24 hours".to_string(),
            });
        }
        Ok(())
    }
}

/// A logged chunk of focused time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusedSession {
    pub id: SessionId,
    pub task_id: TaskId,
    pub date: NaiveDate,
    /// Seconds
    pub duration: f64,
}

impl FocusedSession {
    pub fn new(task_id: TaskId, date: NaiveDate, duration: f64) -> Self {
        Self {
            id: SessionId::new(),
            task_id,
            date,
            duration,
        }
    }
}
