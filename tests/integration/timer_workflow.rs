use std::sync::Arc;

use tempfile::NamedTempFile;
use zenith_tracker_mcp::date::parse_date;
use zenith_tracker_mcp::timer::TimerChangeKind;
use zenith_tracker_mcp::tools::{self, CreateTaskParams, TimerParams, TimerSetting};
use zenith_tracker_mcp::{
    ManualClock, RepeatRule, SqliteStorage, TaskScope, TimerAccumulator, TimerMode, TrackerServer, TrackerStorage,
};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::on(parse_date("2024-09-02").unwrap()))
}

#[test]
fn test_stopwatch_resumes_from_banked_seconds() {
    let clock = clock();
    let timers = TimerAccumulator::new(SqliteStorage::open_in_memory().unwrap(), clock.clone());

    timers.start("task", TimerMode::Stopwatch, 0.0, 10.0).unwrap();
    clock.advance_secs(5);
    assert_eq!(timers.display_seconds("task").unwrap(), Some(15.0));

    let chunk = timers.pause("task").unwrap();
    assert!((chunk - 5.0).abs() < 0.01);
    assert!(timers.state("task").unwrap().is_none());
}

#[test]
fn test_countdown_finalizes_exactly_once() {
    let clock = clock();
    let timers = TimerAccumulator::new(SqliteStorage::open_in_memory().unwrap(), clock.clone());

    timers.start("task", TimerMode::Timer, 60.0, 55.0).unwrap();
    clock.advance_secs(5);

    assert_eq!(timers.display_seconds("task").unwrap(), Some(0.0));
    assert_eq!(timers.finalize_expired().unwrap().len(), 1);
    assert!(timers.finalize_expired().unwrap().is_empty());
}

#[test]
fn test_timers_are_shared_between_connections() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let clock = clock();
    let first = TimerAccumulator::new(SqliteStorage::new(file.path().to_path_buf()).unwrap(), clock.clone());
    let second = TimerAccumulator::new(SqliteStorage::new(file.path().to_path_buf()).unwrap(), clock.clone());

    assert_eq!(second.poll_external().unwrap(), None);

    first.start("shared", TimerMode::Stopwatch, 0.0, 0.0).unwrap();
    clock.advance_secs(3);

    assert!(second.poll_external().unwrap().is_some());
    assert_eq!(second.display_seconds("shared").unwrap(), Some(3.0));

    // Pausing from the other connection ends the run for both
    assert_eq!(second.pause("shared").unwrap(), 3.0);
    assert!(first.state("shared").unwrap().is_none());
}

#[tokio::test]
async fn test_subscribers_hear_external_changes() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let clock = clock();
    let writer = TimerAccumulator::new(SqliteStorage::new(file.path().to_path_buf()).unwrap(), clock.clone());
    let watcher = TimerAccumulator::new(SqliteStorage::new(file.path().to_path_buf()).unwrap(), clock.clone());
    let mut changes = watcher.subscribe();

    writer.start("elsewhere", TimerMode::Timer, 300.0, 0.0).unwrap();
    watcher.poll_external().unwrap();

    let change = changes.recv().await.unwrap();
    assert_eq!(change.kind, TimerChangeKind::External);
    assert_eq!(change.owner, None);
}

#[test]
fn test_server_tick_saves_finished_countdown() {
    let clock = clock();
    let server = TrackerServer::in_memory(clock.clone()).unwrap();
    let today = server.today();

    let created = tools::create_task(
        server.storage(),
        CreateTaskParams {
            name: "Pomodoro".to_string(),
            scope: Some(TaskScope::Today),
            rule: Some(RepeatRule::None),
            date: None,
            subtasks: vec![],
            timer_mode: TimerSetting::Timer,
            timer_minutes: Some(25),
        },
        today,
    )
    .unwrap();
    let task_id = created.task_ids[0].clone();

    tools::start_timer(server.storage(), server.timers(), TimerParams { task_id: task_id.clone() }).unwrap();

    clock.advance_secs(24 * 60);
    assert!(server.tick().unwrap().is_empty());

    clock.advance_secs(60);
    let finished = server.tick().unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].task_id, task_id);
    assert_eq!(finished[0].chunk_seconds, 1500.0);
    assert!(server.tick().unwrap().is_empty());

    let sessions = server.storage().sessions_in_range(today, today).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].duration, 1500.0);
}
