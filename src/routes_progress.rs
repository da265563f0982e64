// --------------------------------------------------
// Handles API endpoints for progress reports and reminders.
//
// Responsibilities:
// - Daily report (rate, active streaks, estimated time)
// - Weekly / monthly rollups with achievements
// - Upcoming reminder times
// --------------------------------------------------

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use routine_tracker::now_fixed_offset;

use crate::{query_date, AppState};

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub date: Option<String>, // "YYYY-MM-DD", today when absent
}

// -----------------------------
// GET /api/progress/daily
// -----------------------------
pub async fn daily(State(state): State<AppState>, Query(q): Query<ProgressQuery>) -> impl IntoResponse {
    let Some(date) = query_date(q.date.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "invalid date").into_response();
    };
    let offset = *now_fixed_offset().offset();

    let tracker = state.tracker.lock().await;
    Json(tracker.progress(offset).daily_report(date)).into_response()
}

// -----------------------------
// GET /api/progress/weekly
// Monday-start week containing date
// -----------------------------
pub async fn weekly(State(state): State<AppState>, Query(q): Query<ProgressQuery>) -> impl IntoResponse {
    let Some(date) = query_date(q.date.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "invalid date").into_response();
    };
    let offset = *now_fixed_offset().offset();

    let tracker = state.tracker.lock().await;
    Json(tracker.progress(offset).week(date)).into_response()
}

// -----------------------------
// GET /api/progress/monthly
// -----------------------------
pub async fn monthly(State(state): State<AppState>, Query(q): Query<ProgressQuery>) -> impl IntoResponse {
    let Some(date) = query_date(q.date.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "invalid date").into_response();
    };
    let offset = *now_fixed_offset().offset();

    let tracker = state.tracker.lock().await;
    Json(tracker.progress(offset).month(date)).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub routine_id: String,
    pub fires_at: String,
}

// -----------------------------
// GET /api/reminders
// Next firing time of every scheduled reminder, soonest first
// -----------------------------
pub async fn reminders(State(state): State<AppState>) -> impl IntoResponse {
    let now = now_fixed_offset();
    let tracker = state.tracker.lock().await;
    let lead = tracker.settings().reminder_lead_minutes;

    let out: Vec<ReminderResponse> = tracker
        .notifier()
        .pending(lead, now)
        .into_iter()
        .map(|(routine_id, at)| ReminderResponse { routine_id, fires_at: at.to_rfc3339() })
        .collect();
    Json(out).into_response()
}
