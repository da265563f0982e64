//! Full-state export / import and the repair pass for persisted data.
//!
//! Import accepts a JSON document with at least `routines`, `tasks` and
//! `progress` keys. Individual records that are malformed are dropped
//! instead of failing the whole load: routines need `id`, `name` and
//! `frequencyType`, tasks need `id`, `title` and `date`.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::kv::KeyValueStore;
use crate::models::{CompletionEvent, Routine, Settings, Snapshot, Task};

pub const FORMAT_VERSION: &str = "1.0.0";

const REQUIRED_KEYS: [&str; 3] = ["routines", "tasks", "progress"];

pub fn default_progress() -> Value {
    serde_json::json!({ "daily": {}, "weekly": {}, "monthly": {} })
}

pub fn export(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn parse_import(text: &str, now: DateTime<FixedOffset>) -> Result<Snapshot> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| TrackerError::ImportFormat(format!("not valid JSON: {e}")))?;

    let Value::Object(mut obj) = doc else {
        return Err(TrackerError::ImportFormat("expected a JSON object".to_string()));
    };

    for key in REQUIRED_KEYS {
        if obj.get(key).is_none_or(Value::is_null) {
            return Err(TrackerError::ImportFormat(format!("missing `{key}`")));
        }
    }

    let settings = match obj.remove("settings") {
        Some(v) if !v.is_null() => serde_json::from_value::<Settings>(v)
            .unwrap_or_else(|e| {
                tracing::warn!("import: ignoring malformed settings: {}", e);
                Settings::default()
            })
            .clamped(),
        _ => Settings::default(),
    };

    let progress = match obj.remove("progress") {
        Some(p @ Value::Object(_)) => p,
        _ => default_progress(),
    };

    Ok(Snapshot {
        routines: repair_routines(obj.remove("routines").unwrap_or(Value::Null)),
        tasks: repair_tasks(obj.remove("tasks").unwrap_or(Value::Null)),
        completions: repair_completions(obj.remove("completions").unwrap_or(Value::Null)),
        progress,
        settings,
        version: obj
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(FORMAT_VERSION)
            .to_string(),
        last_updated: now,
    })
}

// Reads a stored collection as raw JSON. Text that no longer parses is
// treated as absent rather than failing the load.
pub fn load_collection(kv: &impl KeyValueStore, key: &str) -> Result<Value> {
    let Some(text) = kv.get(key)? else {
        return Ok(Value::Null);
    };
    match serde_json::from_str(&text) {
        Ok(v) => Ok(v),
        Err(e) => {
            tracing::warn!("discarding unreadable `{}` collection: {}", key, e);
            Ok(Value::Null)
        }
    }
}

pub fn repair_routines(value: Value) -> Vec<Routine> {
    let mut seen = HashSet::new();
    repair(value, "routine", &["id", "name"], &["frequencyType"])
        .into_iter()
        .filter(|r: &Routine| seen.insert(r.id.clone()))
        .collect()
}

pub fn repair_tasks(value: Value) -> Vec<Task> {
    let mut seen = HashSet::new();
    repair(value, "task", &["id", "title", "date"], &[])
        .into_iter()
        .filter(|t: &Task| seen.insert(t.id.clone()))
        .collect()
}

pub fn repair_completions(value: Value) -> Vec<CompletionEvent> {
    repair(value, "completion", &["routineId", "completedAt"], &[])
}

// Keeps the elements of a JSON array that carry every required field
// (non-empty strings for `strings`, any non-null value for `present`)
// and deserialize cleanly. Anything that is not an array becomes empty.
fn repair<T: DeserializeOwned>(value: Value, kind: &str, strings: &[&str], present: &[&str]) -> Vec<T> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        _ => {
            tracing::warn!("expected a list of {} records, found something else", kind);
            return Vec::new();
        }
    };

    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| {
            strings.iter().all(|k| {
                item.get(*k)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty())
            }) && present.iter().all(|k| item.get(*k).is_some_and(|v| !v.is_null()))
        })
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("dropping malformed {} record: {}", kind, e);
                None
            }
        })
        .collect();

    if kept.len() < total {
        tracing::warn!("repair dropped {} of {} {} records", total - kept.len(), total, kind);
    }
    kept
}
