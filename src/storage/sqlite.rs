/// SQLite implementation of the tracker storage interface
///
/// This module provides the concrete SQLite implementation for storing
/// and retrieving tracker data. It handles all SQL queries and the
/// conversion between rows and domain types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use crate::domain::date::{format_date, parse_date};
use crate::domain::{
    EntryId, FocusedSession, Habit, HabitEntry, HabitId, RepeatGroupId, SessionId, Task, TaskEdit,
    TaskId, TaskScope, TimerMode,
};
use crate::storage::{migrations, SharedSlotStore, StorageError, TrackerStorage};

const HABIT_COLUMNS: &str = "id, name, kind, rule, group_name, created_on";
const ENTRY_COLUMNS: &str = "id, habit_id, date, completed, count";
const TASK_COLUMNS: &str = "id, name, subtasks, completed, completed_at, timer_mode, \
     timer_duration, focused_time, rule, repeat_group_id, scope, date, created_at";
const SESSION_COLUMNS: &str = "id, task_id, date, duration";

/// SQLite-based storage implementation
///
/// Several instances (in one process or many) may open the same file; the
/// shared slots are how they see each other's timers.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::init(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Private database for tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        // Other processes may hold the write lock briefly while saving timers
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StorageError::Connection(format!("Failed to set busy timeout: {}", e)))?;

        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }
}

fn invalid_column(index: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, what.to_string(), Type::Text)
}

fn date_column(row: &Row, index: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(index)?;
    parse_date(&raw).map_err(|_| invalid_column(index, "Invalid date"))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, index: usize, what: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|_| invalid_column(index, what))
}

fn datetime_column(row: &Row, index: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| invalid_column(index, "Invalid datetime"))
    })
    .transpose()
}

fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    let id_str: String = row.get(0)?;
    let id = HabitId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    Ok(Habit::from_existing(
        id,
        row.get(1)?,
        json_column(row, 2, "Invalid habit kind")?,
        json_column(row, 3, "Invalid repeat rule")?,
        row.get(4)?,
        date_column(row, 5)?,
    ))
}

fn row_to_entry(row: &Row) -> rusqlite::Result<HabitEntry> {
    let id_str: String = row.get(0)?;
    let id = EntryId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;
    let habit_id_str: String = row.get(1)?;
    let habit_id = HabitId::from_string(&habit_id_str).map_err(|_| invalid_column(1, "Invalid UUID"))?;

    Ok(HabitEntry::from_existing(
        id,
        habit_id,
        date_column(row, 2)?,
        row.get(3)?, // completed
        row.get(4)?, // count
    ))
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let id_str: String = row.get(0)?;
    let id = TaskId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    let timer_mode: Option<String> = row.get(5)?;
    let timer_mode = match timer_mode.as_deref() {
        None => None,
        Some("timer") => Some(TimerMode::Timer),
        Some("stopwatch") => Some(TimerMode::Stopwatch),
        Some(_) => return Err(invalid_column(5, "Invalid timer mode")),
    };

    let group_str: Option<String> = row.get(9)?;
    let repeat_group_id = group_str
        .map(|s| RepeatGroupId::from_string(&s).map_err(|_| invalid_column(9, "Invalid UUID")))
        .transpose()?;

    let scope_str: String = row.get(10)?;
    let scope = TaskScope::parse(&scope_str).map_err(|_| invalid_column(10, "Invalid scope"))?;

    Ok(Task {
        id,
        name: row.get(1)?,
        subtasks: json_column(row, 2, "Invalid subtasks")?,
        completed: row.get(3)?,
        completed_at: datetime_column(row, 4)?,
        timer_mode,
        timer_duration: row.get(6)?,
        focused_time: row.get(7)?,
        rule: json_column(row, 8, "Invalid repeat rule")?,
        repeat_group_id,
        scope,
        date: date_column(row, 11)?,
        created_at: datetime_column(row, 12)?.ok_or_else(|| invalid_column(12, "Missing created_at"))?,
    })
}

fn row_to_session(row: &Row) -> rusqlite::Result<FocusedSession> {
    let id_str: String = row.get(0)?;
    let id = SessionId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;
    let task_id_str: String = row.get(1)?;
    let task_id = TaskId::from_string(&task_id_str).map_err(|_| invalid_column(1, "Invalid UUID"))?;

    Ok(FocusedSession {
        id,
        task_id,
        date: date_column(row, 2)?,
        duration: row.get(3)?,
    })
}

fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;

    let mut items = Vec::new();
    for item in rows {
        items.push(item?);
    }
    Ok(items)
}

fn insert_task(conn: &Connection, task: &Task) -> Result<(), StorageError> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            TASK_COLUMNS
        ),
        params![
            task.id.to_string(),
            task.name,
            serde_json::to_string(&task.subtasks)?,
            task.completed,
            task.completed_at.map(|dt| dt.to_rfc3339()),
            task.timer_mode.map(|m| m.as_str()),
            task.timer_duration,
            task.focused_time,
            serde_json::to_string(&task.rule)?,
            task.repeat_group_id.as_ref().map(|g| g.to_string()),
            task.scope.as_str(),
            format_date(task.date),
            task.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Rewrite every mutable column of a row; returns rows affected
fn write_task(conn: &Connection, task: &Task) -> Result<usize, StorageError> {
    let rows = conn.execute(
        "UPDATE tasks SET
            name = ?2,
            subtasks = ?3,
            completed = ?4,
            completed_at = ?5,
            timer_mode = ?6,
            timer_duration = ?7,
            focused_time = ?8,
            rule = ?9,
            scope = ?10,
            date = ?11
         WHERE id = ?1",
        params![
            task.id.to_string(),
            task.name,
            serde_json::to_string(&task.subtasks)?,
            task.completed,
            task.completed_at.map(|dt| dt.to_rfc3339()),
            task.timer_mode.map(|m| m.as_str()),
            task.timer_duration,
            task.focused_time,
            serde_json::to_string(&task.rule)?,
            task.scope.as_str(),
            format_date(task.date),
        ],
    )?;
    Ok(rows)
}

impl TrackerStorage for SqliteStorage {
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        self.conn.execute(
            &format!("INSERT INTO habits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", HABIT_COLUMNS),
            params![
                habit.id.to_string(),
                habit.name,
                serde_json::to_string(&habit.kind)?,
                serde_json::to_string(&habit.rule)?,
                habit.group,
                format_date(habit.created_on()),
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
            params![habit_id.to_string()],
            row_to_habit,
        );

        match result {
            Ok(habit) => Ok(habit),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            }),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE habits SET name = ?2, kind = ?3, rule = ?4, group_name = ?5 WHERE id = ?1",
            params![
                habit.id.to_string(),
                habit.name,
                serde_json::to_string(&habit.kind)?,
                serde_json::to_string(&habit.rule)?,
                habit.group,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let entries = tx.execute(
            "DELETE FROM habit_entries WHERE habit_id = ?1",
            params![habit_id.to_string()],
        )?;
        let rows_affected = tx.execute("DELETE FROM habits WHERE id = ?1", params![habit_id.to_string()])?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }
        tx.commit()?;

        tracing::debug!("Deleted habit {} and {} entries", habit_id, entries);
        Ok(())
    }

    fn list_habits(&self, group: Option<&str>) -> Result<Vec<Habit>, StorageError> {
        match group {
            Some(group) => query_all(
                &self.conn,
                &format!(
                    "SELECT {} FROM habits WHERE group_name = ?1 ORDER BY created_on, name",
                    HABIT_COLUMNS
                ),
                params![group],
                row_to_habit,
            ),
            None => query_all(
                &self.conn,
                &format!("SELECT {} FROM habits ORDER BY group_name, created_on, name", HABIT_COLUMNS),
                [],
                row_to_habit,
            ),
        }
    }

    fn upsert_entry(&self, entry: &HabitEntry) -> Result<(), StorageError> {
        self.conn.execute(
            &format!(
                "INSERT INTO habit_entries ({}) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (habit_id, date) DO UPDATE SET
                    completed = excluded.completed,
                    count = excluded.count",
                ENTRY_COLUMNS
            ),
            params![
                entry.id.to_string(),
                entry.habit_id.to_string(),
                format_date(entry.date),
                entry.completed,
                entry.count,
            ],
        )?;

        tracing::debug!("Saved entry for habit {} on {}", entry.habit_id, entry.date);
        Ok(())
    }

    fn get_entry(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<HabitEntry>, StorageError> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {} FROM habit_entries WHERE habit_id = ?1 AND date = ?2", ENTRY_COLUMNS),
                params![habit_id.to_string(), format_date(date)],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn get_entries_for_habit(&self, habit_id: &HabitId) -> Result<Vec<HabitEntry>, StorageError> {
        query_all(
            &self.conn,
            &format!("SELECT {} FROM habit_entries WHERE habit_id = ?1 ORDER BY date", ENTRY_COLUMNS),
            params![habit_id.to_string()],
            row_to_entry,
        )
    }

    fn get_entries_in_range(
        &self,
        habit_id: &HabitId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitEntry>, StorageError> {
        query_all(
            &self.conn,
            &format!(
                "SELECT {} FROM habit_entries
                 WHERE habit_id = ?1 AND date BETWEEN ?2 AND ?3
                 ORDER BY date",
                ENTRY_COLUMNS
            ),
            params![habit_id.to_string(), format_date(start), format_date(end)],
            row_to_entry,
        )
    }

    fn create_task(&self, task: &Task) -> Result<(), StorageError> {
        insert_task(&self.conn, task)?;
        tracing::debug!("Created task: {} ({}) on {}", task.name, task.id, task.date);
        Ok(())
    }

    fn create_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        for task in tasks {
            insert_task(&tx, task)?;
        }
        tx.commit()?;

        tracing::debug!("Created {} task rows", tasks.len());
        Ok(())
    }

    fn get_task(&self, task_id: &TaskId) -> Result<Task, StorageError> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
            params![task_id.to_string()],
            row_to_task,
        );

        match result {
            Ok(task) => Ok(task),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            }),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    fn update_task(&self, task: &Task) -> Result<(), StorageError> {
        if write_task(&self.conn, task)? == 0 {
            return Err(StorageError::TaskNotFound {
                task_id: task.id.to_string(),
            });
        }
        tracing::debug!("Updated task: {} ({})", task.name, task.id);
        Ok(())
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<(), StorageError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![task_id.to_string()])?;

        if rows_affected == 0 {
            return Err(StorageError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }
        tracing::debug!("Deleted task: {}", task_id);
        Ok(())
    }

    fn list_tasks_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Task>, StorageError> {
        query_all(
            &self.conn,
            &format!(
                "SELECT {} FROM tasks WHERE date BETWEEN ?1 AND ?2 ORDER BY date, created_at",
                TASK_COLUMNS
            ),
            params![format_date(start), format_date(end)],
            row_to_task,
        )
    }

    fn list_tasks_by_group(&self, group_id: &RepeatGroupId) -> Result<Vec<Task>, StorageError> {
        query_all(
            &self.conn,
            &format!("SELECT {} FROM tasks WHERE repeat_group_id = ?1 ORDER BY date", TASK_COLUMNS),
            params![group_id.to_string()],
            row_to_task,
        )
    }

    fn update_group(&self, group_id: &RepeatGroupId, edit: &TaskEdit) -> Result<usize, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let pending = query_all(
            &tx,
            &format!(
                "SELECT {} FROM tasks WHERE repeat_group_id = ?1 AND completed = 0",
                TASK_COLUMNS
            ),
            params![group_id.to_string()],
            row_to_task,
        )?;

        let mut updated = 0;
        for mut task in pending {
            edit.apply_to(&mut task);
            updated += write_task(&tx, &task)?;
        }
        tx.commit()?;

        tracing::debug!("Applied series edit to {} rows of group {}", updated, group_id);
        Ok(updated)
    }

    fn delete_group_pending(&self, group_id: &RepeatGroupId) -> Result<usize, StorageError> {
        let deleted = self.conn.execute(
            "DELETE FROM tasks WHERE repeat_group_id = ?1 AND completed = 0",
            params![group_id.to_string()],
        )?;
        tracing::debug!("Deleted {} pending rows of group {}", deleted, group_id);
        Ok(deleted)
    }

    fn set_group_focused_time(&self, group_id: &RepeatGroupId, seconds: f64) -> Result<usize, StorageError> {
        let rows = self.conn.execute(
            "UPDATE tasks SET focused_time = ?2 WHERE repeat_group_id = ?1",
            params![group_id.to_string(), seconds],
        )?;
        Ok(rows)
    }

    fn log_focused_session(&self, session: &FocusedSession) -> Result<(), StorageError> {
        self.conn.execute(
            &format!("INSERT INTO focused_sessions ({}) VALUES (?1, ?2, ?3, ?4)", SESSION_COLUMNS),
            params![
                session.id.to_string(),
                session.task_id.to_string(),
                format_date(session.date),
                session.duration,
            ],
        )?;

        tracing::debug!(
            "Logged {:.1}s focus session for task {} on {}",
            session.duration,
            session.task_id,
            session.date
        );
        Ok(())
    }

    fn sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<FocusedSession>, StorageError> {
        query_all(
            &self.conn,
            &format!(
                "SELECT {} FROM focused_sessions WHERE date BETWEEN ?1 AND ?2 ORDER BY date",
                SESSION_COLUMNS
            ),
            params![format_date(start), format_date(end)],
            row_to_session,
        )
    }
}

impl SharedSlotStore for SqliteStorage {
    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM shared_slots WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<u64, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO shared_slots (key, value, revision) VALUES (?1, ?2, 1)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                revision = shared_slots.revision + 1",
            params![key, value],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT revision FROM shared_slots WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(revision as u64)
    }

    fn slot_revision(&self, key: &str) -> Result<u64, StorageError> {
        let revision: Option<i64> = self
            .conn
            .query_row("SELECT revision FROM shared_slots WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(revision.unwrap_or(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HabitKind, RepeatRule, Subtask};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn series_edit() -> TaskEdit {
        TaskEdit {
            name: "Plan week".to_string(),
            subtasks: vec![Subtask::new("s1".to_string(), "Review".to_string())],
            timer_mode: Some(TimerMode::Stopwatch),
            timer_duration: 0,
            rule: RepeatRule::EveryWeek,
            scope: TaskScope::Week,
        }
    }

    #[test]
    fn test_habit_round_trip_and_cascade_delete() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let habit = Habit::new(
            "Drink water".to_string(),
            HabitKind::Countable { target: 8 },
            RepeatRule::weekly([1, 3]),
            "Health".to_string(),
            d("2024-02-01"),
        )
        .unwrap();
        storage.create_habit(&habit).unwrap();
        assert_eq!(storage.get_habit(&habit.id).unwrap(), habit);

        let first = HabitEntry::counted(habit.id.clone(), d("2024-02-05"), 3).unwrap();
        storage.upsert_entry(&first).unwrap();
        let second = HabitEntry::counted(habit.id.clone(), d("2024-02-05"), 9).unwrap();
        storage.upsert_entry(&second).unwrap();

        let entries = storage.get_entries_for_habit(&habit.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].count, Some(9));

        storage.delete_habit(&habit.id).unwrap();
        assert!(matches!(
            storage.get_habit(&habit.id),
            Err(StorageError::HabitNotFound { .. })
        ));
        assert!(storage.get_entries_for_habit(&habit.id).unwrap().is_empty());
    }

    #[test]
    fn test_group_edit_skips_completed_rows() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let group = RepeatGroupId::new();
        let edit = series_edit();

        let mut rows: Vec<Task> = ["2024-03-03", "2024-03-10", "2024-03-17"]
            .iter()
            .map(|s| Task::from_edit(&edit, d(s), Some(group.clone())))
            .collect();
        rows[0].toggle_complete(Utc::now());
        storage.create_tasks(&rows).unwrap();

        let mut renamed = edit.clone();
        renamed.name = "Plan the week".to_string();
        assert_eq!(storage.update_group(&group, &renamed).unwrap(), 2);

        let stored = storage.list_tasks_by_group(&group).unwrap();
        assert_eq!(stored[0].name, "Plan week");
        assert_eq!(stored[1].name, "Plan the week");
        assert_eq!(stored[2].name, "Plan the week");

        assert_eq!(storage.delete_group_pending(&group).unwrap(), 2);
        let remaining = storage.list_tasks_by_group(&group).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].completed);
    }

    #[test]
    fn test_slot_revisions() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.read_slot("activeTimers").unwrap(), None);
        assert_eq!(storage.slot_revision("activeTimers").unwrap(), 0);

        assert_eq!(storage.write_slot("activeTimers", "{}").unwrap(), 1);
        assert_eq!(storage.write_slot("activeTimers", "{\"a\":1}").unwrap(), 2);
        assert_eq!(storage.read_slot("activeTimers").unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(storage.slot_revision("activeTimers").unwrap(), 2);
    }
}
