//! Command dispatcher.
//!
//! Callers (the HTTP routes, tests, a future UI) describe what the user
//! did as a `Command`. `Tracker::dispatch` applies it to the stores, which
//! persist synchronously, and turns the result into `Effect`s for the
//! notifier. Effects are computed by plain functions so they can be
//! checked without a notifier in the loop.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset, NaiveTime};
use serde::Serialize;
use serde_json::Value;

use crate::backup;
use crate::calendar::{TaskStore, TASKS_KEY};
use crate::error::{Result, TrackerError};
use crate::kv::{self, KeyValueStore};
use crate::models::{
    Routine, RoutineConfig, Settings, Snapshot, Task, TaskConfig, MAX_REMINDER_LEAD_MINUTES,
};
use crate::notifier::{self, Notifier};
use crate::progress::{self, ProgressAggregator};
use crate::store::{self, RoutineStore};
use crate::streak::{Completion, CompletionOutcome};

pub const SETTINGS_KEY: &str = "settings";
pub const PROGRESS_KEY: &str = "progress";

#[derive(Debug, Clone)]
pub enum Command {
    CreateRoutine(RoutineConfig),
    UpdateRoutine { id: String, changes: RoutineConfig },
    DeleteRoutine(String),
    CompleteRoutine(String),
    AddTask(TaskConfig),
    UpdateTask { id: String, changes: TaskConfig },
    DeleteTask(String),
    ToggleTask(String),
    UpdateSettings(Settings),
    Import(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ScheduleReminder { routine_id: String, at: NaiveTime },
    CancelReminder { routine_id: String },
    Notify { title: String, body: String },
}

#[derive(Debug, Clone)]
pub enum Reply {
    Routine(Routine),
    Completed(Completion),
    Task(Task),
    Deleted(bool),
    Settings(Settings),
    Imported { routines: usize, tasks: usize },
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Routine(r) => Json(r).into_response(),
            Reply::Completed(c) => Json(c).into_response(),
            Reply::Task(t) => Json(t).into_response(),
            Reply::Deleted(deleted) => Json(serde_json::json!({ "ok": deleted })).into_response(),
            Reply::Settings(s) => Json(s).into_response(),
            Reply::Imported { routines, tasks } => {
                Json(serde_json::json!({ "routines": routines, "tasks": tasks })).into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub routines_count: usize,
    pub tasks_count: usize,
    pub completions_count: usize,
    pub version: String,
    pub last_updated: Option<DateTime<FixedOffset>>,
}

pub struct Tracker<S, N> {
    kv: S,
    routines: RoutineStore<S>,
    tasks: TaskStore<S>,
    settings: Settings,
    progress: Value,
    notifier: N,
    last_updated: Option<DateTime<FixedOffset>>,
}

impl<S: KeyValueStore + Clone, N: Notifier> Tracker<S, N> {
    pub fn open(kv: S, notifier: N) -> Result<Self> {
        let routines = RoutineStore::open(kv.clone())?;
        let tasks = TaskStore::open(kv.clone())?;

        let settings = match backup::load_collection(&kv, SETTINGS_KEY)? {
            Value::Null => Settings::default(),
            v => serde_json::from_value::<Settings>(v)
                .unwrap_or_else(|e| {
                    tracing::warn!("stored settings unreadable, using defaults: {}", e);
                    Settings::default()
                })
                .clamped(),
        };
        let progress = match backup::load_collection(&kv, PROGRESS_KEY)? {
            v @ Value::Object(_) => v,
            _ => backup::default_progress(),
        };

        let mut tracker = Self {
            kv,
            routines,
            tasks,
            settings,
            progress,
            notifier,
            last_updated: None,
        };

        let effects = resync_effects(&[], tracker.routines.list(), &tracker.settings);
        tracker.apply(effects);
        Ok(tracker)
    }

    pub fn dispatch(&mut self, command: Command, now: DateTime<FixedOffset>) -> Result<Reply> {
        self.routines.roll_over(now)?;

        let (reply, effects) = match command {
            Command::CreateRoutine(config) => {
                let r = self.routines.create(config, now)?;
                let effects = reminder_effects(None, Some(&r), &self.settings);
                (Reply::Routine(r), effects)
            }
            Command::UpdateRoutine { id, changes } => {
                let before = self.routines.get_by_id(&id).cloned();
                let r = self.routines.update(&id, changes)?;
                let effects = reminder_effects(before.as_ref(), Some(&r), &self.settings);
                (Reply::Routine(r), effects)
            }
            Command::DeleteRoutine(id) => {
                let before = self.routines.get_by_id(&id).cloned();
                let deleted = self.routines.delete(&id)?;
                let effects = reminder_effects(before.as_ref(), None, &self.settings);
                (Reply::Deleted(deleted), effects)
            }
            Command::CompleteRoutine(id) => {
                let c = self.routines.complete(&id, now)?;
                let effects = completion_effects(&c, &self.settings);
                (Reply::Completed(c), effects)
            }
            Command::AddTask(input) => (Reply::Task(self.tasks.add(input, now)?), Vec::new()),
            Command::UpdateTask { id, changes } => {
                (Reply::Task(self.tasks.update(&id, changes)?), Vec::new())
            }
            Command::DeleteTask(id) => (Reply::Deleted(self.tasks.delete(&id)?), Vec::new()),
            Command::ToggleTask(id) => {
                let t = self.tasks.toggle(&id)?;
                let effects = task_effects(&t, &self.settings);
                (Reply::Task(t), effects)
            }
            Command::UpdateSettings(settings) => {
                if !settings.lead_in_range() {
                    return Err(TrackerError::Validation(format!(
                        "reminderLeadMinutes must be between 0 and {MAX_REMINDER_LEAD_MINUTES}"
                    )));
                }
                kv::save_json(&self.kv, SETTINGS_KEY, &settings)?;
                let old = std::mem::replace(&mut self.settings, settings.clone());
                let effects = settings_effects(&old, &settings, self.routines.list());
                (Reply::Settings(settings), effects)
            }
            Command::Import(text) => {
                let snapshot = backup::parse_import(&text, now)?;
                let previous = self.routines.list().to_vec();
                let counts = (snapshot.routines.len(), snapshot.tasks.len());

                // One batch so a failed write leaves the old data intact.
                let mut entries = store::entries(&snapshot.routines, &snapshot.completions)?;
                entries.push((TASKS_KEY, kv::to_json(&snapshot.tasks)?));
                entries.push((SETTINGS_KEY, kv::to_json(&snapshot.settings)?));
                entries.push((PROGRESS_KEY, kv::to_json(&snapshot.progress)?));
                kv::write_batch(&self.kv, &entries)?;

                self.routines.adopt(snapshot.routines, snapshot.completions);
                self.tasks.adopt(snapshot.tasks);
                self.settings = snapshot.settings;
                self.progress = snapshot.progress;

                tracing::info!("imported {} routines, {} tasks", counts.0, counts.1);
                let effects = resync_effects(&previous, self.routines.list(), &self.settings);
                (Reply::Imported { routines: counts.0, tasks: counts.1 }, effects)
            }
        };

        self.last_updated = Some(now);
        self.apply(effects);
        Ok(reply)
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleReminder { routine_id, at } => self.notifier.schedule(&routine_id, at),
                Effect::CancelReminder { routine_id } => self.notifier.cancel(&routine_id),
                Effect::Notify { title, body } => self.notifier.notify_now(&title, &body),
            }
        }
    }

    pub fn routines(&self) -> &RoutineStore<S> {
        &self.routines
    }

    pub fn tasks(&self) -> &TaskStore<S> {
        &self.tasks
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn progress(&self, offset: FixedOffset) -> ProgressAggregator<'_> {
        ProgressAggregator::new(self.routines.list(), self.routines.completions(), offset)
    }

    pub fn snapshot(&self, now: DateTime<FixedOffset>) -> Snapshot {
        Snapshot {
            routines: self.routines.list().to_vec(),
            tasks: self.tasks.list().to_vec(),
            completions: self.routines.completions().to_vec(),
            progress: self.progress.clone(),
            settings: self.settings.clone(),
            version: backup::FORMAT_VERSION.to_string(),
            last_updated: self.last_updated.unwrap_or(now),
        }
    }

    pub fn export(&self, now: DateTime<FixedOffset>) -> Result<String> {
        backup::export(&self.snapshot(now))
    }

    pub fn storage_info(&self) -> StorageInfo {
        StorageInfo {
            routines_count: self.routines.list().len(),
            tasks_count: self.tasks.list().len(),
            completions_count: self.routines.completions().len(),
            version: backup::FORMAT_VERSION.to_string(),
            last_updated: self.last_updated,
        }
    }
}

// Reminder changes between two versions of one routine. `None` on either
// side means the routine did not exist.
pub fn reminder_effects(before: Option<&Routine>, after: Option<&Routine>, settings: &Settings) -> Vec<Effect> {
    let Some(id) = after.or(before).map(|r| r.id.clone()) else {
        return Vec::new();
    };

    let old = before.and_then(notifier::reminder_time);
    let new = after
        .and_then(notifier::reminder_time)
        .filter(|_| settings.notifications);

    let mut out = Vec::new();
    if old.is_some() && old != new {
        out.push(Effect::CancelReminder { routine_id: id.clone() });
    }
    if let Some(at) = new {
        if old != new {
            out.push(Effect::ScheduleReminder { routine_id: id, at });
        }
    }
    out
}

// Cancel what `previous` had scheduled, then schedule what `current` wants.
fn resync_effects(previous: &[Routine], current: &[Routine], settings: &Settings) -> Vec<Effect> {
    let mut out: Vec<Effect> = previous
        .iter()
        .filter(|r| notifier::reminder_time(r).is_some())
        .map(|r| Effect::CancelReminder { routine_id: r.id.clone() })
        .collect();

    if settings.notifications {
        out.extend(current.iter().filter_map(|r| {
            notifier::reminder_time(r).map(|at| Effect::ScheduleReminder { routine_id: r.id.clone(), at })
        }));
    }
    out
}

fn settings_effects(old: &Settings, new: &Settings, routines: &[Routine]) -> Vec<Effect> {
    match (old.notifications, new.notifications) {
        (true, false) => resync_effects(routines, &[], new),
        (false, true) => resync_effects(&[], routines, new),
        _ => Vec::new(),
    }
}

pub fn completion_effects(c: &Completion, settings: &Settings) -> Vec<Effect> {
    let mut out = Vec::new();
    if !settings.notifications {
        return out;
    }

    let r = &c.routine;
    if settings.streak_notifications && c.outcome == CompletionOutcome::StreakContinued {
        out.push(Effect::Notify {
            title: "Streak!".to_string(),
            body: format!("{} days in a row on {}", r.streak, r.name),
        });
    }
    if settings.achievement_notifications && r.streak == progress::CHAIN_MASTER_DAYS {
        out.push(Effect::Notify {
            title: "Achievement unlocked".to_string(),
            body: format!("{}-day chain on {}", r.streak, r.name),
        });
    }
    out
}

fn task_effects(t: &Task, settings: &Settings) -> Vec<Effect> {
    if t.completed && settings.notifications {
        vec![Effect::Notify {
            title: "Task completed".to_string(),
            body: format!("{} is done", t.title),
        }]
    } else {
        Vec::new()
    }
}
