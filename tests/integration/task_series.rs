use std::sync::Arc;

use zenith_tracker_mcp::date::parse_date;
use zenith_tracker_mcp::tools::{
    self, CompleteTaskParams, CreateTaskParams, DeleteTaskParams, ListTasksParams, TimerParams, TimerSetting,
    UpdateTaskParams,
};
use zenith_tracker_mcp::{Clock, ManualClock, RepeatRule, TaskId, TaskScope, TrackerServer, TrackerStorage};

fn server(today: &str) -> (TrackerServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::on(parse_date(today).unwrap()));
    (TrackerServer::in_memory(clock.clone()).unwrap(), clock)
}

fn create(server: &TrackerServer, name: &str, scope: TaskScope, rule: RepeatRule) -> Vec<String> {
    tools::create_task(
        server.storage(),
        CreateTaskParams {
            name: name.to_string(),
            scope: Some(scope),
            rule: Some(rule),
            date: None,
            subtasks: vec!["outline".to_string(), "draft".to_string()],
            timer_mode: TimerSetting::Stopwatch,
            timer_minutes: None,
        },
        server.today(),
    )
    .unwrap()
    .task_ids
}

fn task_id(raw: &str) -> TaskId {
    TaskId::from_string(raw).unwrap()
}

#[test]
fn test_series_edit_leaves_completed_rows_alone() {
    let (server, clock) = server("2024-12-20");
    // Fridays from 2024-12-20: the 20th and the 27th
    let ids = create(&server, "Review", TaskScope::Today, RepeatRule::weekly([5]));
    assert_eq!(ids.len(), 2);

    tools::complete_task(
        server.storage(),
        CompleteTaskParams { task_id: ids[0].clone() },
        clock.now_utc(),
    )
    .unwrap();

    tools::update_task(
        server.storage(),
        UpdateTaskParams {
            task_id: ids[1].clone(),
            name: Some("Weekly review".to_string()),
            subtasks: None,
            timer_mode: None,
            timer_minutes: None,
            rule: None,
            scope: None,
            date: None,
        },
    )
    .unwrap();

    let done = server.storage().get_task(&task_id(&ids[0])).unwrap();
    let pending = server.storage().get_task(&task_id(&ids[1])).unwrap();
    assert_eq!(done.name, "Review");
    assert!(done.completed);
    assert_eq!(pending.name, "Weekly review");
    assert_eq!(pending.subtasks.len(), 2);
}

#[test]
fn test_deleting_series_stops_its_timer() {
    let (server, clock) = server("2024-12-20");
    let ids = create(&server, "Study", TaskScope::Today, RepeatRule::Daily);
    assert_eq!(ids.len(), 12);

    tools::start_timer(server.storage(), server.timers(), TimerParams { task_id: ids[0].clone() }).unwrap();
    clock.advance_secs(120);

    let deleted = tools::delete_task(
        server.storage(),
        server.timers(),
        DeleteTaskParams { task_id: ids[3].clone() },
    )
    .unwrap();

    assert_eq!(deleted.deleted, 12);
    assert!(server.timers().running().unwrap().is_empty());
    let today = server.today();
    assert!(server.storage().sessions_in_range(today, today).unwrap().is_empty());
}

#[test]
fn test_month_view_shows_one_row_per_series() {
    let (server, _clock) = server("2024-03-10");
    create(&server, "Budget", TaskScope::Month, RepeatRule::EveryMonth);
    create(&server, "Inbox zero", TaskScope::Today, RepeatRule::Daily);

    let month = tools::list_tasks(
        server.storage(),
        server.timers(),
        ListTasksParams {
            view: Some(TaskScope::Month),
            date: None,
        },
        server.today(),
    )
    .unwrap();

    assert_eq!(month.tasks.len(), 1);
    assert_eq!(month.tasks[0].name, "Budget");
    assert_eq!(month.days_left, Some(21));

    let today = tools::list_tasks(server.storage(), server.timers(), ListTasksParams::default(), server.today())
        .unwrap();
    assert_eq!(today.tasks.len(), 1);
    assert_eq!(today.tasks[0].name, "Inbox zero");
}

#[test]
fn test_week_series_focus_survives_across_rows() {
    let (server, clock) = server("2024-11-04");
    let ids = create(&server, "Side project", TaskScope::Week, RepeatRule::EveryWeek);

    tools::start_timer(server.storage(), server.timers(), TimerParams { task_id: ids[0].clone() }).unwrap();
    clock.advance_secs(600);
    tools::pause_timer(server.storage(), server.timers(), TimerParams { task_id: ids[0].clone() }, server.today())
        .unwrap();

    // The next week's row resumes from the shared total
    tools::start_timer(server.storage(), server.timers(), TimerParams { task_id: ids[1].clone() }).unwrap();
    clock.advance_secs(60);
    let status = tools::timer_status(
        server.storage(),
        server.timers(),
        tools::TimerStatusParams { task_id: Some(ids[1].clone()) },
    )
    .unwrap();
    assert_eq!(status.timers[0].display_seconds, 660.0);
}
