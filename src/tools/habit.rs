/// Tools for creating, logging and reviewing habits
///
/// This module implements the habit_create, habit_update, habit_delete,
/// habit_list, habit_log, habit_status and habit_calendar MCP tools.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::date::{day_of_month, end_of_month, format_date, parse_date, start_of_month};
use crate::domain::{
    compute_stats, is_loggable, is_trackable, month_grid, Habit, HabitEntry, HabitKind, HabitStats,
    MonthGrid, RepeatRule,
};
use crate::storage::TrackerStorage;
use crate::tools::{date_or_today, parse_habit_id, plural, ToolError};

/// Parameters for creating a new habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Name of the habit
    pub name: String,
    /// Binary (the default) or countable with a daily target
    #[serde(default)]
    pub kind: Option<HabitKind>,
    /// When the habit is due: daily, weekly (daysOfWeek, 0 = Sunday) or monthly (daysOfMonth)
    pub rule: RepeatRule,
    /// Optional group label
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub habit_id: String,
    pub message: String,
}

/// Create a new habit starting today
pub fn create_habit<S: TrackerStorage>(
    storage: &S,
    params: CreateHabitParams,
    today: NaiveDate,
) -> Result<CreateHabitResponse, ToolError> {
    let habit = Habit::new(
        params.name,
        params.kind.unwrap_or(HabitKind::Binary),
        params.rule,
        params.group.unwrap_or_default(),
        today,
    )?;
    storage.create_habit(&habit)?;

    tracing::info!("Created habit '{}' ({})", habit.name, habit.id);

    Ok(CreateHabitResponse {
        habit_id: habit.id.to_string(),
        message: format!(
            "✅ Created habit '{}' ({}{})\nHabit ID: {}",
            habit.name,
            habit.rule,
            habit
                .target_display()
                .map(|t| format!(", target {}", t))
                .unwrap_or_default(),
            habit.id
        ),
    })
}

/// Parameters for updating a habit; omitted fields stay as they are
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    pub habit_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<HabitKind>,
    #[serde(default)]
    pub rule: Option<RepeatRule>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateHabitResponse {
    pub message: String,
}

pub fn update_habit<S: TrackerStorage>(
    storage: &S,
    params: UpdateHabitParams,
) -> Result<UpdateHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let mut habit = storage.get_habit(&habit_id)?;

    habit.update(params.name, params.kind, params.rule, params.group)?;
    storage.update_habit(&habit)?;

    Ok(UpdateHabitResponse {
        message: format!("✏️ Updated habit '{}' ({})", habit.name, habit.rule),
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteHabitParams {
    pub habit_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteHabitResponse {
    pub message: String,
}

/// Delete a habit and its whole history
pub fn delete_habit<S: TrackerStorage>(
    storage: &S,
    params: DeleteHabitParams,
) -> Result<DeleteHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&habit_id)?;
    storage.delete_habit(&habit_id)?;

    Ok(DeleteHabitResponse {
        message: format!("🗑️ Deleted habit '{}' and its history", habit.name),
    })
}

/// One habit with its statistics as of today
#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub habit_id: String,
    pub name: String,
    pub group: String,
    pub rule: String,
    pub target: Option<String>,
    pub due_today: bool,
    pub done_today: bool,
    pub stats: HabitStats,
}

fn summarize<S: TrackerStorage>(storage: &S, habit: &Habit, today: NaiveDate) -> Result<HabitSummary, ToolError> {
    let entries = storage.get_entries_for_habit(&habit.id)?;
    let dated: Vec<_> = entries.iter().map(|e| e.to_dated(&habit.kind)).collect();
    let stats = compute_stats(&habit.rule, habit.created_on(), &dated, today);
    let done_today = entries
        .iter()
        .any(|e| e.date == today && e.qualifies(&habit.kind));

    Ok(HabitSummary {
        habit_id: habit.id.to_string(),
        name: habit.name.clone(),
        group: habit.group.clone(),
        rule: habit.rule.to_string(),
        target: habit.target_display(),
        due_today: is_trackable(today, &habit.rule),
        done_today,
        stats,
    })
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct ListHabitsParams {
    /// Only habits with this group label
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<HabitSummary>,
    pub message: String,
}

pub fn list_habits<S: TrackerStorage>(
    storage: &S,
    params: ListHabitsParams,
    today: NaiveDate,
) -> Result<ListHabitsResponse, ToolError> {
    let habits = storage.list_habits(params.group.as_deref())?;
    let summaries = habits
        .iter()
        .map(|habit| summarize(storage, habit, today))
        .collect::<Result<Vec<_>, _>>()?;

    if summaries.is_empty() {
        return Ok(ListHabitsResponse {
            habits: summaries,
            message: "No habits found. Create your first habit to get started!".to_string(),
        });
    }

    let due = summaries.iter().filter(|h| h.due_today).count();
    let done = summaries.iter().filter(|h| h.due_today && h.done_today).count();

    let mut lines = vec![format!(
        "📋 {} ({} of {} due today done)\n",
        plural(summaries.len() as u64, "habit"),
        done,
        due
    )];
    for h in &summaries {
        let status = match (h.due_today, h.done_today) {
            (true, true) => "✅ done today",
            (true, false) => "⏳ due today",
            (false, _) => "💤 not due today",
        };
        lines.push(format!(
            "🎯 {}{} [{}]\n   📅 {} | 🔥 Streak: {} | {}\n   ID: {}",
            h.name,
            if h.group.is_empty() { String::new() } else { format!(" ({})", h.group) },
            h.target.as_deref().unwrap_or("yes/no"),
            h.rule,
            h.stats.current_streak,
            status,
            h.habit_id
        ));
    }

    Ok(ListHabitsResponse {
        habits: summaries,
        message: lines.join("\n"),
    })
}

/// Parameters for logging a habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LogHabitParams {
    pub habit_id: String,
    /// Day to log (YYYY-MM-DD), defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// Count for countable habits
    #[serde(default)]
    pub count: Option<u32>,
    /// Set a binary habit's state explicitly instead of toggling it
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LogHabitResponse {
    pub message: String,
    pub qualifies: bool,
    pub current_streak: u32,
}

/// Record a habit on a loggable day
///
/// Binary habits toggle unless `completed` is given; countable habits set
/// the day's count.
pub fn log_habit<S: TrackerStorage>(
    storage: &S,
    params: LogHabitParams,
    today: NaiveDate,
) -> Result<LogHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&habit_id)?;
    let date = date_or_today(params.date.as_deref(), today)?;

    if !is_loggable(&habit, date, today) {
        let reason = if date > today {
            "it is in the future"
        } else if date < habit.created_on() {
            "it is before the habit was created"
        } else {
            "the habit is not due that day"
        };
        return Err(ToolError::InvalidArgument(format!(
            "Cannot log '{}' on {}: {}",
            habit.name,
            format_date(date),
            reason
        )));
    }

    let existing = storage.get_entry(&habit_id, date)?;
    let mut entry = match habit.kind {
        HabitKind::Binary => {
            let completed = params
                .completed
                .unwrap_or_else(|| !existing.as_ref().and_then(|e| e.completed).unwrap_or(false));
            HabitEntry::binary(habit_id.clone(), date, completed)
        }
        HabitKind::Countable { .. } => {
            let count = params.count.ok_or_else(|| {
                ToolError::InvalidArgument(format!("'{}' is countable; a count is required", habit.name))
            })?;
            HabitEntry::counted(habit_id.clone(), date, count)?
        }
    };
    if let Some(existing) = existing {
        entry.id = existing.id;
    }
    storage.upsert_entry(&entry)?;

    let summary = summarize(storage, &habit, today)?;
    let qualifies = entry.qualifies(&habit.kind);
    let state = match (habit.kind, entry.count) {
        (HabitKind::Countable { target }, Some(count)) => format!("{}/{}", count, target),
        _ if qualifies => "done".to_string(),
        _ => "not done".to_string(),
    };

    Ok(LogHabitResponse {
        message: format!(
            "🔥 Logged '{}' on {}: {}. Current streak: {}",
            habit.name,
            format_date(date),
            state,
            summary.stats.current_streak
        ),
        qualifies,
        current_streak: summary.stats.current_streak,
    })
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct HabitStatusParams {
    /// Habit to report on; all habits when omitted
    #[serde(default)]
    pub habit_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HabitStatusResponse {
    pub habits: Vec<HabitSummary>,
    pub message: String,
}

/// Streak and completion statistics for one or all habits
pub fn habit_status<S: TrackerStorage>(
    storage: &S,
    params: HabitStatusParams,
    today: NaiveDate,
) -> Result<HabitStatusResponse, ToolError> {
    let habits = match params.habit_id {
        Some(raw) => vec![storage.get_habit(&parse_habit_id(&raw)?)?],
        None => storage.list_habits(None)?,
    };
    let summaries = habits
        .iter()
        .map(|habit| summarize(storage, habit, today))
        .collect::<Result<Vec<_>, _>>()?;

    let message = if summaries.is_empty() {
        "No habits found. Create your first habit to get started!".to_string()
    } else {
        summaries
            .iter()
            .map(|h| {
                format!(
                    "🎯 {}\n   Current streak: {} | Done {} of {} due days ({:.1}%) | Tracking for {}\n   {}",
                    h.name,
                    h.stats.current_streak,
                    h.stats.done_instances,
                    h.stats.total_instances,
                    h.stats.completion_rate() * 100.0,
                    plural(h.stats.active_days, "day"),
                    h.stats.motivational_message()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    Ok(HabitStatusResponse {
        habits: summaries,
        message,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HabitCalendarParams {
    pub habit_id: String,
    /// Month to show as YYYY-MM (or any YYYY-MM-DD inside it), defaults to this month
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HabitCalendarResponse {
    pub grid: MonthGrid,
    pub message: String,
}

fn parse_month(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ToolError> {
    match raw.map(str::trim) {
        Some(s) if s.len() == 7 => Ok(parse_date(&format!("{}-01", s))?),
        other => date_or_today(other, today),
    }
}

/// Month grid of a habit with what was done on each due day
pub fn habit_calendar<S: TrackerStorage>(
    storage: &S,
    params: HabitCalendarParams,
    today: NaiveDate,
) -> Result<HabitCalendarResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&habit_id)?;
    let month = parse_month(params.month.as_deref(), today)?;

    let entries = storage.get_entries_in_range(&habit_id, start_of_month(month), end_of_month(month))?;
    let grid = month_grid(&habit, &entries, month, today);

    let mut text = format!(
        "📅 {} for {}\n Su  Mo  Tu  We  Th  Fr  Sa\n",
        grid.month_start.format("%B %Y"),
        habit.name
    );
    let mut column = grid.leading_blanks as usize;
    text.push_str(&"    ".repeat(column));
    for cell in &grid.cells {
        let marker = if cell.qualifies {
            '✓'
        } else if cell.loggable {
            '✗'
        } else if cell.trackable && cell.future {
            '○'
        } else {
            ' '
        };
        text.push_str(&format!("{:>3}{}", day_of_month(cell.date), marker));
        column += 1;
        if column % 7 == 0 {
            text.push('\n');
        }
    }
    text.push_str("\n✓ done  ✗ missed  ○ upcoming");

    Ok(HabitCalendarResponse { grid, message: text })
}
