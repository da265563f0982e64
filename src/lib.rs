// Core library for the routine tracker.
//
// Everything here can be driven directly from tests. Axum only shows
// up as response conversions; the binary in main.rs owns the routes.

pub mod backup;     // Export / import document + repair pass
pub mod calendar;   // Ad-hoc calendar tasks
pub mod commands;   // Command dispatcher and side-effect requests
pub mod config;     // Environment configuration
pub mod error;      // TrackerError and HTTP status mapping
pub mod kv;         // Key-value persistence (memory / file)
pub mod models;     // Data structures (Routine, Task, Settings, ...)
pub mod notifier;   // Reminder collaborator
pub mod progress;   // Daily / weekly / monthly aggregation
pub mod recurrence; // Due-date evaluation
pub mod store;      // Routine collection + completion log
pub mod streak;     // Streak bookkeeping on completion

use chrono::{DateTime, FixedOffset};

pub use commands::{Command, Effect, Reply, Tracker};
pub use error::{Result, TrackerError};

// Current wall clock in the system's local offset.
pub fn now_fixed_offset() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}
