// --------------------------------------------------
// Settings and whole-dataset endpoints.
//
// Responsibilities:
// - Get / update settings
// - Export the full dataset as a JSON download
// - Import a previously exported document
// - Storage summary
// --------------------------------------------------

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use routine_tracker::models::Settings;
use routine_tracker::{now_fixed_offset, Command};

use crate::AppState;

// -----------------------------
// GET /api/settings
// -----------------------------
pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    Json(tracker.settings().clone()).into_response()
}

// -----------------------------
// PUT /api/settings
// Turning notifications off cancels every reminder, on reschedules them
// -----------------------------
pub async fn put_settings(State(state): State<AppState>, Json(s): Json<Settings>) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::UpdateSettings(s), now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// GET /api/export
// Full dataset as an attachment
// -----------------------------
pub async fn export(State(state): State<AppState>) -> impl IntoResponse {
    let now = now_fixed_offset();
    let tracker = state.tracker.lock().await;
    let body = match tracker.export(now) {
        Ok(text) => text,
        Err(e) => return e.into_response(),
    };

    let disposition = format!(
        "attachment; filename=\"routine-tracker-backup-{}.json\"",
        now.format("%Y-%m-%d")
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

// -----------------------------
// POST /api/import
// Body is an exported document; replaces everything on success
// -----------------------------
pub async fn import(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let mut tracker = state.tracker.lock().await;
    match tracker.dispatch(Command::Import(body), now_fixed_offset()) {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

// -----------------------------
// GET /api/storage
// -----------------------------
pub async fn storage(State(state): State<AppState>) -> impl IntoResponse {
    let tracker = state.tracker.lock().await;
    Json(tracker.storage_info()).into_response()
}
