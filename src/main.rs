// Define HTTP modules (the tracker itself lives in the library crate)
mod routes_data;     // HTTP handlers for settings, export / import, storage info
mod routes_progress; // HTTP handlers for progress reports and reminders
mod routes_routines; // HTTP handlers for routine CRUD, completion, stats
mod routes_tasks;    // HTTP handlers for calendar task CRUD

use std::sync::Arc;

// Import axum routing utilities and Router
use axum::{
    routing::{get, post, put}, // HTTP method helpers
    Router, // Main router type
};
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};

use routine_tracker::config::Config;
use routine_tracker::kv::FileStore;
use routine_tracker::notifier::LogNotifier;
use routine_tracker::Tracker;

pub type AppTracker = Tracker<FileStore, LogNotifier>;

// Shared by every handler. Commands run one at a time under the lock.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<AppTracker>>,
}

// "YYYY-MM-DD" from a query string, or today when absent.
pub fn query_date(raw: Option<&str>) -> Option<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        None => Some(routine_tracker::now_fixed_offset().date_naive()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routine_tracker=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)?;

    let tracker = Tracker::open(FileStore::new(&config.data_dir), LogNotifier::new())?;
    tracing::info!(
        "loaded {} routines, {} tasks from {}",
        tracker.routines().list().len(),
        tracker.tasks().list().len(),
        config.data_dir.display()
    );

    let state = AppState { tracker: Arc::new(Mutex::new(tracker)) };

    let api = Router::new()
        // routines
        .route("/routines", get(routes_routines::list_routines).post(routes_routines::create_routine))
        .route("/routines/due", get(routes_routines::due_routines))
        .route(
            "/routines/:id",
            get(routes_routines::get_routine)
                .put(routes_routines::update_routine)
                .delete(routes_routines::delete_routine),
        )
        .route("/routines/:id/complete", post(routes_routines::complete_routine))
        .route("/routines/:id/stats", get(routes_routines::routine_stats))
        // tasks
        .route("/tasks", get(routes_tasks::get_tasks).post(routes_tasks::create_task))
        .route("/tasks/:id", put(routes_tasks::update_task).delete(routes_tasks::delete_task))
        .route("/tasks/:id/toggle", post(routes_tasks::toggle_task))
        // progress
        .route("/progress/daily", get(routes_progress::daily))
        .route("/progress/weekly", get(routes_progress::weekly))
        .route("/progress/monthly", get(routes_progress::monthly))
        .route("/reminders", get(routes_progress::reminders))
        // settings + data
        .route("/settings", get(routes_data::get_settings).put(routes_data::put_settings))
        .route("/export", get(routes_data::export))
        .route("/import", post(routes_data::import))
        .route("/storage", get(routes_data::storage))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http());

    tracing::info!("server running at http://{}", config.addr);
    tracing::info!("static files from {}", config.static_dir.display());
    tracing::info!("api base: http://{}/api", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
