/// Tool for the focus time overview

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::{overview_range, FocusOverview};
use crate::storage::TrackerStorage;
use crate::tools::{date_or_today, ToolError};

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct FocusOverviewParams {
    /// Day to center the overview on (YYYY-MM-DD), defaults to today
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FocusOverviewResponse {
    pub overview: FocusOverview,
    pub message: String,
}

/// Sum logged focus sessions for the day, its week and its month
pub fn focus_overview<S: TrackerStorage>(
    storage: &S,
    params: FocusOverviewParams,
    today: NaiveDate,
) -> Result<FocusOverviewResponse, ToolError> {
    let date = date_or_today(params.date.as_deref(), today)?;
    let (start, end) = overview_range(date);
    let sessions = storage.sessions_in_range(start, end)?;

    let overview = FocusOverview::compute(&sessions, date);
    let message = overview.render();

    Ok(FocusOverviewResponse { overview, message })
}
