/// Tools for dated tasks and recurring task series
///
/// This module implements the task_create, task_update, task_delete,
/// task_list, task_complete and subtask_toggle MCP tools. A recurring task
/// is materialized as one row per generated date, all sharing a repeat
/// group id; series edits and deletes leave completed rows alone.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::date::{
    add_days, days_between, end_of_month, end_of_year, format_date, start_of_month, start_of_week,
    weekday_index,
};
use crate::domain::{
    generate, RepeatGroupId, RepeatRule, Subtask, Task, TaskEdit, TaskScope, TimerMode,
};
use crate::storage::{SharedSlotStore, TrackerStorage};
use crate::timer::TimerAccumulator;
use crate::tools::{date_or_today, format_clock, parse_task_id, plural, ToolError};

/// Timer choice for a task, including no timer at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimerSetting {
    #[default]
    None,
    Timer,
    Stopwatch,
}

impl TimerSetting {
    pub fn mode(self) -> Option<TimerMode> {
        match self {
            TimerSetting::None => None,
            TimerSetting::Timer => Some(TimerMode::Timer),
            TimerSetting::Stopwatch => Some(TimerMode::Stopwatch),
        }
    }
}

/// Parameters for creating a task or a recurring series
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    pub name: String,
    /// View the task belongs to: today (default), week or month
    #[serde(default)]
    pub scope: Option<TaskScope>,
    /// Repeat rule. Today tasks allow none/daily/weekly/monthly, week tasks
    /// none/every_week, month tasks none/every_month
    #[serde(default)]
    pub rule: Option<RepeatRule>,
    /// First date (YYYY-MM-DD), defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// Checklist item names
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub timer_mode: TimerSetting,
    /// Countdown length in minutes (timer mode)
    #[serde(default)]
    pub timer_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub task_ids: Vec<String>,
    pub repeat_group_id: Option<String>,
    pub message: String,
}

fn new_subtasks(names: &[String]) -> Vec<Subtask> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| Subtask::new(uuid::Uuid::new_v4().to_string(), n.to_string()))
        .collect()
}

/// Keep id and completion of subtasks whose name survives the edit
fn merge_subtasks(current: &[Subtask], names: &[String]) -> Vec<Subtask> {
    new_subtasks(names)
        .into_iter()
        .map(|fresh| {
            current
                .iter()
                .find(|s| s.name == fresh.name)
                .cloned()
                .unwrap_or(fresh)
        })
        .collect()
}

fn timer_seconds(mode: Option<TimerMode>, minutes: Option<u32>) -> u32 {
    match mode {
        Some(TimerMode::Timer) => minutes.unwrap_or(0).saturating_mul(60),
        _ => 0,
    }
}

/// Create one task, or one row per date of a recurring series
///
/// Series run from the anchor date to the end of that calendar year.
pub fn create_task<S: TrackerStorage>(
    storage: &S,
    params: CreateTaskParams,
    today: NaiveDate,
) -> Result<CreateTaskResponse, ToolError> {
    let anchor = date_or_today(params.date.as_deref(), today)?;
    let timer_mode = params.timer_mode.mode();
    let edit = TaskEdit {
        name: params.name,
        subtasks: new_subtasks(&params.subtasks),
        timer_mode,
        timer_duration: timer_seconds(timer_mode, params.timer_minutes),
        rule: params.rule.unwrap_or_default(),
        scope: params.scope.unwrap_or(TaskScope::Today),
    };
    edit.validate()?;

    if !edit.rule.repeats() {
        let task = Task::from_edit(&edit, anchor, None);
        storage.create_task(&task)?;
        return Ok(CreateTaskResponse {
            task_ids: vec![task.id.to_string()],
            repeat_group_id: None,
            message: format!(
                "✅ Created task '{}' on {}\nTask ID: {}",
                task.name,
                format_date(anchor),
                task.id
            ),
        });
    }

    let group = RepeatGroupId::new();
    let rows: Vec<Task> = generate(anchor, &edit.rule, end_of_year(anchor))
        .into_iter()
        .map(|date| Task::from_edit(&edit, date, Some(group.clone())))
        .collect();
    if !rows.is_empty() {
        storage.create_tasks(&rows)?;
    }

    tracing::info!("Created series '{}' with {} rows (group {})", edit.name.trim(), rows.len(), group);

    let message = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => format!(
            "🔁 Created '{}' repeating {}: {} from {} to {}\nSeries ID: {}",
            first.name,
            edit.rule,
            plural(rows.len() as u64, "occurrence"),
            format_date(first.date),
            format_date(last.date),
            group
        ),
        _ => format!(
            "No dates of {} fall between {} and the end of the year; nothing was created",
            edit.rule,
            format_date(anchor)
        ),
    };

    Ok(CreateTaskResponse {
        task_ids: rows.iter().map(|t| t.id.to_string()).collect(),
        repeat_group_id: if rows.is_empty() { None } else { Some(group.to_string()) },
        message,
    })
}

/// Parameters for editing a task; omitted fields stay as they are
///
/// Editing any row of a series edits every pending row of it.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskParams {
    pub task_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement checklist; items keeping their name keep their state
    #[serde(default)]
    pub subtasks: Option<Vec<String>>,
    #[serde(default)]
    pub timer_mode: Option<TimerSetting>,
    #[serde(default)]
    pub timer_minutes: Option<u32>,
    #[serde(default)]
    pub rule: Option<RepeatRule>,
    #[serde(default)]
    pub scope: Option<TaskScope>,
    /// Move a one-off task to another day (YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTaskResponse {
    pub updated: usize,
    pub message: String,
}

pub fn update_task<S: TrackerStorage>(
    storage: &S,
    params: UpdateTaskParams,
) -> Result<UpdateTaskResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let mut task = storage.get_task(&task_id)?;
    let mut edit = task.edit();

    if let Some(name) = params.name {
        edit.name = name;
    }
    if let Some(names) = params.subtasks {
        edit.subtasks = merge_subtasks(&task.subtasks, &names);
    }
    if let Some(setting) = params.timer_mode {
        edit.timer_mode = setting.mode();
        if edit.timer_mode != Some(TimerMode::Timer) {
            edit.timer_duration = 0;
        }
    }
    if params.timer_minutes.is_some() {
        edit.timer_duration = timer_seconds(edit.timer_mode, params.timer_minutes);
    }
    if let Some(rule) = params.rule {
        edit.rule = rule;
    }
    if let Some(scope) = params.scope {
        edit.scope = scope;
    }
    edit.validate()?;

    match task.repeat_group_id.clone() {
        Some(group) => {
            if params.date.is_some() {
                return Err(ToolError::InvalidArgument(
                    "Occurrences of a recurring task cannot be moved".to_string(),
                ));
            }
            let updated = storage.update_group(&group, &edit)?;
            Ok(UpdateTaskResponse {
                updated,
                message: format!(
                    "✏️ Updated {} of '{}' (completed ones unchanged)",
                    plural(updated as u64, "pending occurrence"),
                    edit.name.trim()
                ),
            })
        }
        None => {
            if edit.rule.repeats() {
                return Err(ToolError::InvalidArgument(
                    "A one-off task cannot become recurring; create a recurring task instead".to_string(),
                ));
            }
            edit.apply_to(&mut task);
            if let Some(date) = params.date.as_deref() {
                task.date = date_or_today(Some(date), task.date)?;
            }
            storage.update_task(&task)?;
            Ok(UpdateTaskResponse {
                updated: 1,
                message: format!("✏️ Updated task '{}' on {}", task.name, format_date(task.date)),
            })
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteTaskParams {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub deleted: usize,
    pub message: String,
}

/// Delete a task, or every pending row of its series
///
/// Running timers of the deleted rows are stopped first; their last chunk
/// is discarded.
pub fn delete_task<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: DeleteTaskParams,
) -> Result<DeleteTaskResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let task = storage.get_task(&task_id)?;

    timers.pause(&task.id.to_string())?;

    let deleted = match &task.repeat_group_id {
        Some(group) => {
            for row in storage.list_tasks_by_group(group)? {
                if !row.completed {
                    timers.pause(&row.id.to_string())?;
                }
            }
            storage.delete_group_pending(group)?
        }
        None => {
            storage.delete_task(&task_id)?;
            1
        }
    };

    Ok(DeleteTaskResponse {
        deleted,
        message: format!("🗑️ Deleted {} of '{}'", plural(deleted as u64, "task"), task.name),
    })
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct ListTasksParams {
    /// today (default), week or month
    #[serde(default)]
    pub view: Option<TaskScope>,
    /// Any day inside the period to show (YYYY-MM-DD), defaults to today
    #[serde(default)]
    pub date: Option<String>,
}

/// One task as shown in a view
#[derive(Debug, Serialize)]
pub struct TaskListing {
    pub task_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub subtasks: Vec<Subtask>,
    pub timer_mode: Option<TimerMode>,
    pub timer_running: bool,
    /// Remaining (timer) or total (stopwatch) seconds right now
    pub timer_display_seconds: f64,
    pub focused_time: f64,
    pub rule: String,
    pub repeat_group_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub view: TaskScope,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Days left in the period when it contains today
    pub days_left: Option<i64>,
    pub tasks: Vec<TaskListing>,
    pub message: String,
}

/// Keep the first row of each repeat group
fn dedupe_by_group(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|t| match &t.repeat_group_id {
            Some(group) => seen.insert(group.clone()),
            None => true,
        })
        .collect()
}

/// Tasks of the today, week or month view containing `date`
///
/// Week and month views show each series once.
pub fn list_tasks<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: ListTasksParams,
    today: NaiveDate,
) -> Result<ListTasksResponse, ToolError> {
    let view = params.view.unwrap_or(TaskScope::Today);
    let date = date_or_today(params.date.as_deref(), today)?;

    let (start, end) = match view {
        TaskScope::Today => (date, date),
        TaskScope::Week => {
            let start = start_of_week(date);
            (start, add_days(start, 6))
        }
        TaskScope::Month => (start_of_month(date), end_of_month(date)),
    };

    let mut tasks: Vec<Task> = storage
        .list_tasks_in_range(start, end)?
        .into_iter()
        .filter(|t| t.scope == view)
        .collect();
    if view != TaskScope::Today {
        tasks = dedupe_by_group(tasks);
    }

    let days_left = (start <= today && today <= end).then(|| match view {
        TaskScope::Today => 0,
        TaskScope::Week => 6 - weekday_index(today) as i64,
        TaskScope::Month => days_between(today, end),
    });

    let running = timers.running()?;
    let now = timers.clock().now_millis();
    let listings: Vec<TaskListing> = tasks
        .into_iter()
        .map(|task| {
            let record = running.get(&task.id.to_string());
            TaskListing {
                task_id: task.id.to_string(),
                timer_running: record.is_some(),
                timer_display_seconds: record
                    .map(|r| r.display_seconds(now))
                    .unwrap_or_else(|| task.idle_display_seconds()),
                name: task.name,
                date: task.date,
                completed: task.completed,
                subtasks: task.subtasks,
                timer_mode: task.timer_mode,
                focused_time: task.focused_time,
                rule: task.rule.to_string(),
                repeat_group_id: task.repeat_group_id.map(|g| g.to_string()),
            }
        })
        .collect();

    let message = render_listing(view, start, end, days_left, &listings);

    Ok(ListTasksResponse {
        view,
        start,
        end,
        days_left,
        tasks: listings,
        message,
    })
}

fn render_listing(
    view: TaskScope,
    start: NaiveDate,
    end: NaiveDate,
    days_left: Option<i64>,
    listings: &[TaskListing],
) -> String {
    let period = if start == end {
        format_date(start)
    } else {
        format!("{} to {}", format_date(start), format_date(end))
    };
    let mut lines = vec![format!("🗓️ {} tasks for {}", view.as_str(), period)];
    if let (Some(left), true) = (days_left, view != TaskScope::Today) {
        lines.push(format!("{} left", plural(left as u64, "day")));
    }

    if listings.is_empty() {
        lines.push("No tasks. Add one with task_create!".to_string());
        return lines.join("\n");
    }

    let done = listings.iter().filter(|t| t.completed).count();
    lines.push(format!("{} of {} done\n", done, listings.len()));

    for t in listings {
        let mut line = format!(
            "{} {}{}",
            if t.completed { "✅" } else { "⬜" },
            t.name,
            if t.repeat_group_id.is_some() { format!(" 🔁 {}", t.rule) } else { String::new() }
        );
        if let Some(mode) = t.timer_mode {
            line.push_str(&format!(
                " | {} {} {}",
                mode.as_str(),
                format_clock(t.timer_display_seconds),
                if t.timer_running { "▶" } else { "⏸" }
            ));
        }
        line.push_str(&format!("\n   ID: {}", t.task_id));
        for s in &t.subtasks {
            line.push_str(&format!(
                "\n   {} {} ({})",
                if s.completed { "☑" } else { "☐" },
                s.name,
                s.id
            ));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompleteTaskParams {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub completed: bool,
    pub message: String,
}

/// Toggle a task's completion
pub fn complete_task<S: TrackerStorage>(
    storage: &S,
    params: CompleteTaskParams,
    now: DateTime<Utc>,
) -> Result<CompleteTaskResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let mut task = storage.get_task(&task_id)?;
    task.toggle_complete(now);
    storage.update_task(&task)?;

    Ok(CompleteTaskResponse {
        completed: task.completed,
        message: if task.completed {
            format!("🎉 Completed '{}'", task.name)
        } else {
            format!("↩️ Marked '{}' as not done", task.name)
        },
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ToggleSubtaskParams {
    pub task_id: String,
    /// Subtask ID (or exact name)
    pub subtask_id: String,
}

/// Toggle one checklist item; the task completes when every item is done
pub fn toggle_subtask<S: TrackerStorage>(
    storage: &S,
    params: ToggleSubtaskParams,
    now: DateTime<Utc>,
) -> Result<CompleteTaskResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let mut task = storage.get_task(&task_id)?;

    let subtask_id = task
        .subtasks
        .iter()
        .find(|s| s.id == params.subtask_id || s.name == params.subtask_id)
        .map(|s| s.id.clone())
        .unwrap_or(params.subtask_id);
    task.toggle_subtask(&subtask_id, now)?;
    storage.update_task(&task)?;

    let done = task.subtasks.iter().filter(|s| s.completed).count();
    Ok(CompleteTaskResponse {
        completed: task.completed,
        message: format!(
            "{} '{}': {} of {} subtasks done",
            if task.completed { "🎉" } else { "☑" },
            task.name,
            done,
            task.subtasks.len()
        ),
    })
}
