// --------------------------------------------------
// Handles API endpoints related to calendar task CRUD.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Toggle the completed flag
// - Date / week / month listings for the calendar view
// --------------------------------------------------

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use routine_tracker::models::{Task, TaskConfig};
use routine_tracker::{now_fixed_offset, Command, Reply};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub date: Option<String>,  // "YYYY-MM-DD"
    pub week: Option<String>,  // "YYYY-MM-DD", first day of the 7-day window
    pub month: Option<String>, // "YYYY-MM"
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub now: String,
    pub tasks: Vec<Task>,
}

// -----------------------------
// GET /api/tasks
// All tasks, or those on one date / week / month
// -----------------------------
pub async fn get_tasks(State(state): State<AppState>, Query(q): Query<TasksQuery>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    let store = tracker.tasks();

    let tasks: Vec<&Task> = if let Some(raw) = q.date.as_deref() {
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            return (StatusCode::BAD_REQUEST, "invalid date").into_response();
        };
        store.for_date(date)
    } else if let Some(raw) = q.week.as_deref() {
        let Ok(start) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            return (StatusCode::BAD_REQUEST, "invalid week").into_response();
        };
        store.for_week(start)
    } else if let Some(raw) = q.month.as_deref() {
        let Ok(first) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") else {
            return (StatusCode::BAD_REQUEST, "invalid month").into_response();
        };
        store.for_month(first.year(), first.month())
    } else {
        store.list().iter().collect()
    };

    Json(TasksResponse {
        now: now_fixed_offset().to_rfc3339(),
        tasks: tasks.into_iter().cloned().collect(),
    })
    .into_response()
}

// -----------------------------
// POST /api/tasks
// -----------------------------
pub async fn create_task(State(state): State<AppState>, Json(input): Json<TaskConfig>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::AddTask(input), now_fixed_offset()) {
        Ok(reply) => (StatusCode::CREATED, reply).into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// PUT /api/tasks/:id
// Partial update of an existing task
// -----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<TaskConfig>,
) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::UpdateTask { id, changes }, now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// DELETE /api/tasks/:id
// -----------------------------
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::DeleteTask(id), now_fixed_offset()) {
        Ok(Reply::Deleted(false)) => (StatusCode::NOT_FOUND, "task not found").into_response(),
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// POST /api/tasks/:id/toggle
// Flips completed
// -----------------------------
pub async fn toggle_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::ToggleTask(id), now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}
