/// Tools for task focus timers
///
/// This module implements the timer_start, timer_pause, timer_save and
/// timer_status MCP tools, plus the save applied when a countdown runs out.
/// The accumulator only tracks running time; banking it into the task's
/// focused time and logging sessions happens here.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{FocusedSession, Task, TaskId, TimerMode};
use crate::storage::{SharedSlotStore, StorageError, TrackerStorage};
use crate::timer::TimerAccumulator;
use crate::tools::{parse_task_id, ToolError};

/// Chunks this short are not worth a session entry
const MIN_LOGGED_CHUNK_SECS: f64 = 1.0;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TimerParams {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub task_id: String,
    pub running: bool,
    /// Seconds of the run that just ended (0 when starting)
    pub chunk_seconds: f64,
    /// Banked focus seconds after this call
    pub focused_time: f64,
    pub message: String,
}

/// `MM:SS`, minutes uncapped
pub fn format_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    format!("{:02}:{:02}", (seconds / 60.0).floor() as u64, (seconds % 60.0).floor() as u64)
}

/// Write a new focus total, across the series for week and month tasks
fn set_focused_time<S: TrackerStorage>(storage: &S, task: &Task, seconds: f64) -> Result<(), StorageError> {
    match &task.repeat_group_id {
        Some(group) if task.scope.shares_focus_across_group() => {
            storage.set_group_focused_time(group, seconds)?;
        }
        _ => {
            let mut updated = task.clone();
            updated.focused_time = seconds;
            storage.update_task(&updated)?;
        }
    }
    Ok(())
}

fn log_chunk<S: TrackerStorage>(storage: &S, task: &Task, chunk: f64, today: NaiveDate) -> Result<(), StorageError> {
    if chunk > MIN_LOGGED_CHUNK_SECS {
        storage.log_focused_session(&FocusedSession::new(task.id.clone(), today, chunk))?;
    }
    Ok(())
}

/// Bank a paused chunk into the task's focus total and log it
pub fn apply_pause<S: TrackerStorage>(
    storage: &S,
    task: &Task,
    chunk: f64,
    today: NaiveDate,
) -> Result<f64, StorageError> {
    let total = task.focused_time + chunk;
    set_focused_time(storage, task, total)?;
    log_chunk(storage, task, chunk, today)?;
    Ok(total)
}

/// Log the final chunk and reset the task's focus total
pub fn apply_save<S: TrackerStorage>(
    storage: &S,
    task: &Task,
    chunk: f64,
    today: NaiveDate,
) -> Result<(), StorageError> {
    log_chunk(storage, task, chunk, today)?;
    set_focused_time(storage, task, 0.0)
}

/// Start a task's timer
///
/// A stopwatch resumes from the task's banked time; a countdown always
/// starts from its full duration.
pub fn start_timer<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: TimerParams,
) -> Result<TimerResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let task = storage.get_task(&task_id)?;
    let owner = task.id.to_string();

    let mode = task
        .timer_mode
        .ok_or_else(|| ToolError::InvalidArgument(format!("'{}' has no timer", task.name)))?;
    if timers.state(&owner)?.is_some() {
        return Err(ToolError::InvalidArgument(format!(
            "The timer for '{}' is already running",
            task.name
        )));
    }

    let accumulated = match mode {
        TimerMode::Stopwatch => task.focused_time,
        TimerMode::Timer => 0.0,
    };
    let record = timers.start(&owner, mode, task.timer_duration as f64, accumulated)?;

    Ok(TimerResponse {
        task_id: owner,
        running: true,
        chunk_seconds: 0.0,
        focused_time: task.focused_time,
        message: format!(
            "▶️ Started {} for '{}' at {}",
            mode.as_str(),
            task.name,
            format_clock(record.display_seconds(record.start_time))
        ),
    })
}

/// Pause a running timer, banking the elapsed chunk
pub fn pause_timer<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: TimerParams,
    today: NaiveDate,
) -> Result<TimerResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let task = storage.get_task(&task_id)?;
    let owner = task.id.to_string();

    if timers.state(&owner)?.is_none() {
        return Err(ToolError::InvalidArgument(format!(
            "The timer for '{}' is not running",
            task.name
        )));
    }

    let chunk = timers.pause(&owner)?;
    let total = apply_pause(storage, &task, chunk, today)?;

    Ok(TimerResponse {
        task_id: owner,
        running: false,
        chunk_seconds: chunk,
        focused_time: total,
        message: format!(
            "⏸️ Paused '{}' after {} ({} focused so far)",
            task.name,
            format_clock(chunk),
            format_clock(total)
        ),
    })
}

/// Stop the timer if running, log the last chunk and reset the focus total
pub fn save_timer<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: TimerParams,
    today: NaiveDate,
) -> Result<TimerResponse, ToolError> {
    let task_id = parse_task_id(&params.task_id)?;
    let task = storage.get_task(&task_id)?;
    let owner = task.id.to_string();

    let chunk = timers.pause(&owner)?;
    apply_save(storage, &task, chunk, today)?;

    Ok(TimerResponse {
        task_id: owner,
        running: false,
        chunk_seconds: chunk,
        focused_time: 0.0,
        message: format!("💾 Saved focus session for '{}' ({} this run)", task.name, format_clock(chunk)),
    })
}

/// A countdown that ran out and was saved
#[derive(Debug, Clone, Serialize)]
pub struct FinishedTimer {
    pub task_id: String,
    pub task_name: Option<String>,
    pub chunk_seconds: f64,
}

/// Save every countdown that has reached zero
///
/// Timers whose task no longer exists are dropped with a warning.
pub fn finalize_expired_timers<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    today: NaiveDate,
) -> Result<Vec<FinishedTimer>, ToolError> {
    let mut finished = Vec::new();

    for (owner, chunk) in timers.finalize_expired()? {
        let task = match TaskId::from_string(&owner) {
            Ok(task_id) => match storage.get_task(&task_id) {
                Ok(task) => Some(task),
                Err(StorageError::TaskNotFound { .. }) => None,
                Err(e) => return Err(e.into()),
            },
            Err(_) => None,
        };

        match &task {
            Some(task) => {
                apply_save(storage, task, chunk, today)?;
                tracing::info!("Timer for '{}' finished after {:.0}s", task.name, chunk);
            }
            None => tracing::warn!("Dropped finished timer for unknown task {}", owner),
        }

        finished.push(FinishedTimer {
            task_id: owner,
            task_name: task.map(|t| t.name),
            chunk_seconds: chunk,
        });
    }

    Ok(finished)
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct TimerStatusParams {
    /// Task to report on; every running timer when omitted
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimerView {
    pub task_id: String,
    pub task_name: Option<String>,
    pub mode: Option<TimerMode>,
    pub running: bool,
    /// Remaining (timer) or total (stopwatch) seconds
    pub display_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct TimerStatusResponse {
    pub timers: Vec<TimerView>,
    pub message: String,
}

pub fn timer_status<S: TrackerStorage, T: SharedSlotStore>(
    storage: &S,
    timers: &TimerAccumulator<T>,
    params: TimerStatusParams,
) -> Result<TimerStatusResponse, ToolError> {
    let now = timers.clock().now_millis();

    let views = match params.task_id {
        Some(raw) => {
            let task = storage.get_task(&parse_task_id(&raw)?)?;
            let record = timers.state(&task.id.to_string())?;
            vec![TimerView {
                task_id: task.id.to_string(),
                mode: task.timer_mode,
                running: record.is_some(),
                display_seconds: record
                    .map(|r| r.display_seconds(now))
                    .unwrap_or_else(|| task.idle_display_seconds()),
                task_name: Some(task.name),
            }]
        }
        None => {
            let mut views = Vec::new();
            for (owner, record) in timers.running()? {
                let name = match TaskId::from_string(&owner) {
                    Ok(id) => match storage.get_task(&id) {
                        Ok(task) => Some(task.name),
                        Err(StorageError::TaskNotFound { .. }) => None,
                        Err(e) => return Err(e.into()),
                    },
                    Err(_) => None,
                };
                views.push(TimerView {
                    task_id: owner,
                    task_name: name,
                    mode: Some(record.mode),
                    running: true,
                    display_seconds: record.display_seconds(now),
                });
            }
            views
        }
    };

    let message = if views.is_empty() {
        "No timers running".to_string()
    } else {
        views
            .iter()
            .map(|v| {
                format!(
                    "{} {} {} {}",
                    if v.running { "▶️" } else { "⏸️" },
                    v.task_name.as_deref().unwrap_or(&v.task_id),
                    v.mode.map(|m| m.as_str()).unwrap_or("no timer"),
                    format_clock(v.display_seconds)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(TimerStatusResponse {
        timers: views,
        message,
    })
}
