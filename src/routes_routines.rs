// --------------------------------------------------
// Handles API endpoints for routines.
//
// Responsibilities:
// - Create / read / update / delete routines
// - Record a completion (streak bookkeeping)
// - Per-routine stats and the "due on date" list
// --------------------------------------------------

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use routine_tracker::models::{Routine, RoutineConfig};
use routine_tracker::{now_fixed_offset, Command, Reply};

use crate::{query_date, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

// -----------------------------
// GET /api/routines
// All routines, optionally filtered by category
// -----------------------------
pub async fn list_routines(State(state): State<AppState>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    let routines: Vec<Routine> = match q.category.as_deref() {
        Some(c) => tracker.routines().by_category(c).into_iter().cloned().collect(),
        None => tracker.routines().list().to_vec(),
    };
    Json(routines).into_response()
}

// -----------------------------
// POST /api/routines
// -----------------------------
pub async fn create_routine(State(state): State<AppState>, Json(input): Json<RoutineConfig>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::CreateRoutine(input), now_fixed_offset()) {
        Ok(reply) => (StatusCode::CREATED, reply).into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// GET /api/routines/:id
// -----------------------------
pub async fn get_routine(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    match tracker.routines().get_by_id(&id) {
        Some(r) => Json(r.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "routine not found").into_response(),
    }
}

// -----------------------------
// PUT /api/routines/:id
// Partial update; absent fields are left alone
// -----------------------------
pub async fn update_routine(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(changes): Json<RoutineConfig>,
) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::UpdateRoutine { id, changes }, now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// DELETE /api/routines/:id
// -----------------------------
pub async fn delete_routine(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::DeleteRoutine(id), now_fixed_offset()) {
        Ok(Reply::Deleted(false)) => (StatusCode::NOT_FOUND, "routine not found").into_response(),
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// POST /api/routines/:id/complete
// 409 when already completed today
// -----------------------------
pub async fn complete_routine(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::CompleteRoutine(id), now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// GET /api/routines/:id/stats
// -----------------------------
pub async fn routine_stats(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    match tracker.routines().stats(&id, now_fixed_offset()) {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    pub date: Option<String>, // "YYYY-MM-DD", today when absent
}

#[derive(Debug, Serialize)]
pub struct DueResponse {
    pub date: String,
    pub due: Vec<Routine>,
    pub completed: Vec<String>,
}

// -----------------------------
// GET /api/routines/due?date=YYYY-MM-DD
// Routines due on the date, plus the ids already completed that day
// -----------------------------
pub async fn due_routines(State(state): State<AppState>, Query(q): Query<DueQuery>) -> impl IntoResponse {
    let Some(date) = query_date(q.date.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "invalid date").into_response();
    };
    let now = now_fixed_offset();
    let offset = *now.offset();

    let tracker = state.tracker.lock().await;
    // Today is evaluated at the current instant, other days at their end.
    let due: Vec<Routine> = if date == now.date_naive() {
        tracker.routines().due_at(now).into_iter().cloned().collect()
    } else {
        tracker.routines().due_on(date, offset).into_iter().cloned().collect()
    };
    let completed = tracker
        .routines()
        .completed_on(date, offset)
        .into_iter()
        .map(|r| r.id.clone())
        .collect();

    Json(DueResponse { date: date.format("%Y-%m-%d").to_string(), due, completed }).into_response()
}
