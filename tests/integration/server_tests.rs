use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::NamedTempFile;
use zenith_tracker_mcp::date::parse_date;
use zenith_tracker_mcp::mcp::McpServer;
use zenith_tracker_mcp::{ManualClock, TrackerServer, TrackerStorage};

fn request(server: &mut McpServer, id: u64, name: &str, arguments: Value) -> Value {
    let line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string();
    serde_json::to_value(server.process_line(&line).expect("requests get a response")).unwrap()
}

#[tokio::test]
async fn test_server_opens_database_file() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let server = TrackerServer::new(temp_file.path().to_path_buf())
        .await
        .expect("Failed to create server");

    assert!(server.storage().list_habits(None).unwrap().is_empty());
    assert!(server.timers().running().unwrap().is_empty());
}

#[test]
fn test_database_persistence() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_file.path().to_path_buf();
    let clock = Arc::new(ManualClock::on(parse_date("2024-02-01").unwrap()));

    {
        let mut server = McpServer::new(TrackerServer::with_clock(db_path.clone(), clock.clone()).unwrap());
        let created = request(
            &mut server,
            1,
            "habit_create",
            json!({ "name": "Stretch", "rule": { "type": "weekly", "daysOfWeek": [4] } }),
        );
        assert_eq!(created["result"]["isError"], Value::Bool(false));
    }

    let reopened = tokio_test::block_on(TrackerServer::new(db_path)).expect("Failed to reopen server");
    let habits = reopened.storage().list_habits(None).unwrap();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name, "Stretch");
}

#[test]
fn test_full_day_over_json_rpc() {
    let clock = Arc::new(ManualClock::on(parse_date("2024-02-01").unwrap()));
    let mut server = McpServer::new(TrackerServer::in_memory(clock.clone()).unwrap());

    let listed = serde_json::to_value(
        server
            .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(listed["result"]["tools"].as_array().unwrap().len(), 18);

    let created = request(
        &mut server,
        2,
        "task_create",
        json!({ "name": "Write report", "timer_mode": "stopwatch", "subtasks": ["intro"] }),
    );
    let task_id = created["result"]["structuredContent"]["task_ids"][0]
        .as_str()
        .unwrap()
        .to_string();

    request(&mut server, 3, "timer_start", json!({ "task_id": task_id }));
    clock.advance_secs(1800);
    let paused = request(&mut server, 4, "timer_pause", json!({ "task_id": task_id }));
    assert_eq!(paused["result"]["structuredContent"]["focused_time"], 1800.0);

    let overview = request(&mut server, 5, "focus_overview", json!({}));
    let text = overview["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Today: 30 min"), "{}", text);

    let toggled = request(&mut server, 6, "subtask_toggle", json!({ "task_id": task_id, "subtask_id": "intro" }));
    assert_eq!(toggled["result"]["structuredContent"]["completed"], Value::Bool(true));

    let missing = request(&mut server, 7, "timer_pause", json!({ "task_id": task_id }));
    assert_eq!(missing["result"]["isError"], Value::Bool(true));
}
