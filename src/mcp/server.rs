/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Routes tool calls to the tracker tools
/// 3. Sends JSON-RPC responses to stdout
///
/// Between requests a one second tick saves countdowns that ran out and
/// notices timer changes made by other processes.

use std::time::Duration;

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools::{self, ToolError};
use crate::{ServerError, TrackerServer};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Build a tool definition whose input schema comes from its parameter type
fn tool<P: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let schema = schemars::schema_for!(P);
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"})),
    }
}

/// Every tool the server offers
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool::<tools::CreateHabitParams>(
            "habit_create",
            "Create a habit with a daily, weekly or monthly schedule",
        ),
        tool::<tools::UpdateHabitParams>("habit_update", "Rename a habit or change its kind, schedule or group"),
        tool::<tools::DeleteHabitParams>("habit_delete", "Delete a habit and all its entries"),
        tool::<tools::ListHabitsParams>(
            "habit_list",
            "List habits with today's status and streaks, optionally for one group",
        ),
        tool::<tools::LogHabitParams>(
            "habit_log",
            "Record a habit for a day: toggles a yes/no habit or sets a count",
        ),
        tool::<tools::HabitStatusParams>("habit_status", "Streaks and completion totals for one or all habits"),
        tool::<tools::HabitCalendarParams>("habit_calendar", "Month calendar of a habit's entries"),
        tool::<tools::CreateTaskParams>(
            "task_create",
            "Create a task, or a recurring series running to the end of the year",
        ),
        tool::<tools::UpdateTaskParams>(
            "task_update",
            "Edit a task; edits to a series apply to all of its unfinished tasks",
        ),
        tool::<tools::DeleteTaskParams>(
            "task_delete",
            "Delete a task; deleting from a series removes its unfinished tasks",
        ),
        tool::<tools::ListTasksParams>("task_list", "List tasks for a day, its week or its month"),
        tool::<tools::CompleteTaskParams>("task_complete", "Toggle a task's completion"),
        tool::<tools::ToggleSubtaskParams>("subtask_toggle", "Toggle one checklist item of a task"),
        tool::<tools::TimerParams>("timer_start", "Start a task's timer or stopwatch"),
        tool::<tools::TimerParams>("timer_pause", "Pause a running timer and bank the focused time"),
        tool::<tools::TimerParams>("timer_save", "Stop a timer, log the session and reset the task's clock"),
        tool::<tools::TimerStatusParams>("timer_status", "Show running timers"),
        tool::<tools::FocusOverviewParams>(
            "focus_overview",
            "Focused time for a day, its week and its month",
        ),
    ]
}

/// Text plus structured JSON for a tool's response
fn render<R: Serialize>(result: Result<R, ToolError>) -> ToolCallResult {
    match result {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(value) => {
                let text = value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                ToolCallResult::success(text, Some(value))
            }
            Err(e) => ToolCallResult::error(format!("Failed to encode response: {}", e)),
        },
        Err(e) => {
            debug!("Tool failed: {}", e);
            ToolCallResult::failure(&e)
        }
    }
}

/// MCP server that handles communication with the client
pub struct McpServer {
    tracker: TrackerServer,
    initialized: bool,
}

impl McpServer {
    pub fn new(tracker: TrackerServer) -> Self {
        Self {
            tracker,
            initialized: false,
        }
    }

    pub fn tracker(&self) -> &TrackerServer {
        &self.tracker
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(response) = self.process_line(&line) {
                            let response_str = serde_json::to_string(&response)?;

                            stdout.write_all(response_str.as_bytes()).await?;
                            stdout.write_all(b"\n").await?;
                            stdout.flush().await?;

                            debug!("Sent response: {}", response_str);
                        }
                    }
                    Ok(None) => {
                        info!("MCP server shutting down (stdin closed)");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read from stdin: {}", e);
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.tracker.tick() {
                        warn!("Timer tick failed: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns `None` for blank lines and notifications.
    pub fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                    None,
                ));
            }
        };

        self.handle_request(request)
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        };
        Some(response)
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    fn handle_initialize(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        match params.map(serde_json::from_value::<InitializeParams>) {
            Some(Ok(params)) => {
                let client = params.client_info.map(|c| format!("{} {}", c.name, c.version));
                info!(
                    "MCP client connected: {} (protocol {})",
                    client.as_deref().unwrap_or("unknown"),
                    params.protocol_version
                );
            }
            Some(Err(e)) => warn!("Unreadable initialize parameters: {}", e),
            None => info!("MCP client connected"),
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Zenith Tracker MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
        }
    }

    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        debug!("Calling tool '{}'", tool_params.name);
        match self.call_tool(&tool_params.name, Value::Object(tool_params.arguments)) {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
            },
            Err(e) => JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid arguments for '{}': {}", tool_params.name, e),
                None,
            ),
        }
    }

    /// Run one tool; only undecodable arguments fail the call itself
    pub fn call_tool(&self, name: &str, args: Value) -> Result<ToolCallResult, serde_json::Error> {
        let storage = self.tracker.storage();
        let timers = self.tracker.timers();
        let today = self.tracker.today();
        let now = self.tracker.clock().now_utc();

        macro_rules! call {
            ($params:ty, |$p:ident| $body:expr) => {{
                let $p: $params = serde_json::from_value(args)?;
                render($body)
            }};
        }

        let result = match name {
            "habit_create" => call!(tools::CreateHabitParams, |p| tools::create_habit(storage, p, today)),
            "habit_update" => call!(tools::UpdateHabitParams, |p| tools::update_habit(storage, p)),
            "habit_delete" => call!(tools::DeleteHabitParams, |p| tools::delete_habit(storage, p)),
            "habit_list" => call!(tools::ListHabitsParams, |p| tools::list_habits(storage, p, today)),
            "habit_log" => call!(tools::LogHabitParams, |p| tools::log_habit(storage, p, today)),
            "habit_status" => call!(tools::HabitStatusParams, |p| tools::habit_status(storage, p, today)),
            "habit_calendar" => call!(tools::HabitCalendarParams, |p| tools::habit_calendar(storage, p, today)),
            "task_create" => call!(tools::CreateTaskParams, |p| tools::create_task(storage, p, today)),
            "task_update" => call!(tools::UpdateTaskParams, |p| tools::update_task(storage, p)),
            "task_delete" => call!(tools::DeleteTaskParams, |p| tools::delete_task(storage, timers, p)),
            "task_list" => call!(tools::ListTasksParams, |p| tools::list_tasks(storage, timers, p, today)),
            "task_complete" => call!(tools::CompleteTaskParams, |p| tools::complete_task(storage, p, now)),
            "subtask_toggle" => call!(tools::ToggleSubtaskParams, |p| tools::toggle_subtask(storage, p, now)),
            "timer_start" => call!(tools::TimerParams, |p| tools::start_timer(storage, timers, p)),
            "timer_pause" => call!(tools::TimerParams, |p| tools::pause_timer(storage, timers, p, today)),
            "timer_save" => call!(tools::TimerParams, |p| tools::save_timer(storage, timers, p, today)),
            "timer_status" => call!(tools::TimerStatusParams, |p| tools::timer_status(storage, timers, p)),
            "focus_overview" => call!(tools::FocusOverviewParams, |p| tools::focus_overview(storage, p, today)),
            _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::date::parse_date;
    use crate::timer::ManualClock;

    fn server() -> McpServer {
        let clock = Arc::new(ManualClock::on(parse_date("2024-03-04").unwrap()));
        McpServer::new(TrackerServer::in_memory(clock).unwrap())
    }

    fn call(server: &mut McpServer, id: u64, name: &str, arguments: Value) -> Value {
        let line = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        })
        .to_string();
        let response = server.process_line(&line).unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_lists_every_tool_with_schema() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 18);
        let create = tools.iter().find(|t| t.name == "task_create").unwrap();
        assert!(create.input_schema["properties"].get("scope").is_some());
    }

    #[test]
    fn test_initialize_and_notification() {
        let mut server = server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1"}}}"#)
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["result"]["protocolVersion"], MCP_VERSION);

        assert!(server
            .process_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());
        assert!(server.initialized);
    }

    #[test]
    fn test_protocol_faults() {
        let mut server = server();
        let parse = serde_json::to_value(server.process_line("{not json").unwrap()).unwrap();
        assert_eq!(parse["error"]["code"], error_codes::PARSE_ERROR);

        let unknown = serde_json::to_value(
            server
                .process_line(r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(unknown["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let bad_args = call(&mut server, 3, "habit_create", json!({ "rule": "sometimes" }));
        assert_eq!(bad_args["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[test]
    fn test_tool_failure_is_error_result() {
        let mut server = server();
        let value = call(
            &mut server,
            4,
            "task_complete",
            json!({ "task_id": "00000000-0000-0000-0000-000000000000" }),
        );
        assert_eq!(value["result"]["isError"], Value::Bool(true));
        assert_eq!(value["result"]["structuredContent"]["errorCode"], error_codes::NOT_FOUND);
    }

    #[test]
    fn test_habit_round_trip_through_tools() {
        let mut server = server();
        let created = call(
            &mut server,
            5,
            "habit_create",
            json!({ "name": "Read", "rule": { "type": "daily" } }),
        );
        assert_eq!(created["result"]["isError"], Value::Bool(false));
        let habit_id = created["result"]["structuredContent"]["habit_id"].as_str().unwrap().to_string();

        let logged = call(&mut server, 6, "habit_log", json!({ "habit_id": habit_id }));
        assert_eq!(logged["result"]["isError"], Value::Bool(false));

        let listed = call(&mut server, 7, "habit_list", json!({}));
        let text = listed["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Read"));
    }
}
