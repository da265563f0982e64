// --------------------------------------------------
// Ad-hoc calendar tasks.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Toggle the completed flag
// - Date / week / month lookups for the calendar view
// --------------------------------------------------

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate};
use uuid::Uuid;

use crate::backup;
use crate::error::{Result, TrackerError};
use crate::kv::{self, KeyValueStore};
use crate::models::{Task, TaskConfig};
use crate::notifier;

pub const TASKS_KEY: &str = "tasks";

pub struct TaskStore<S> {
    kv: S,
    tasks: Vec<Task>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn open(kv: S) -> Result<Self> {
        let mut store = Self { kv, tasks: Vec::new() };
        store.reload()?;
        Ok(store)
    }

    pub fn reload(&mut self) -> Result<()> {
        let raw = backup::load_collection(&self.kv, TASKS_KEY)?;
        self.tasks = backup::repair_tasks(raw);
        Ok(())
    }

    fn commit(&mut self, tasks: Vec<Task>) -> Result<()> {
        kv::save_json(&self.kv, TASKS_KEY, &tasks)?;
        self.adopt(tasks);
        Ok(())
    }

    // Takes over a collection that is already on disk.
    pub(crate) fn adopt(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn add(&mut self, input: TaskConfig, now: DateTime<FixedOffset>) -> Result<Task> {
        let title = match input.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(TrackerError::Validation("title is required".to_string())),
        };
        let Some(date) = input.date else {
            return Err(TrackerError::Validation("date is required".to_string()));
        };
        check_time(input.time.as_deref())?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title,
            description: input.description.unwrap_or_default(),
            date,
            time: input.time,
            priority: input.priority.unwrap_or_default(),
            completed: false,
            created_at: Some(now),
        };

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next)?;

        tracing::info!("added task {} on {}", task.id, task.date);
        Ok(task)
    }

    pub fn update(&mut self, id: &str, input: TaskConfig) -> Result<Task> {
        if input.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TrackerError::Validation("title is required".to_string()));
        }
        check_time(input.time.as_deref())?;

        let mut next = self.tasks.clone();
        let Some(t) = next.iter_mut().find(|t| t.id == id) else {
            return Err(TrackerError::task_not_found(id));
        };

        if let Some(v) = input.title { t.title = v.trim().to_string(); }
        if let Some(v) = input.description { t.description = v; }
        if let Some(v) = input.date { t.date = v; }
        if input.time.is_some() { t.time = input.time; }
        if let Some(v) = input.priority { t.priority = v; }
        if let Some(v) = input.completed { t.completed = v; }

        let updated = t.clone();
        self.commit(next)?;
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.tasks.len();
        let next: Vec<Task> = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        if next.len() == before {
            return Ok(false);
        }
        self.commit(next)?;
        tracing::info!("deleted task {}", id);
        Ok(true)
    }

    // Flips the completed flag.
    pub fn toggle(&mut self, id: &str) -> Result<Task> {
        let mut next = self.tasks.clone();
        let Some(t) = next.iter_mut().find(|t| t.id == id) else {
            return Err(TrackerError::task_not_found(id));
        };
        t.completed = !t.completed;

        let updated = t.clone();
        self.commit(next)?;
        Ok(updated)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn for_date(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.date == date).collect()
    }

    // Seven days starting at `start`, inclusive.
    pub fn for_week(&self, start: NaiveDate) -> Vec<&Task> {
        let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
        self.tasks
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .collect()
    }

    // `month` is 1..=12.
    pub fn for_month(&self, year: i32, month: u32) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
            .collect()
    }
}

fn check_time(time: Option<&str>) -> Result<()> {
    match time {
        Some(t) if !t.is_empty() && notifier::parse_clock(t).is_none() => {
            Err(TrackerError::Validation("time must be HH:MM".to_string()))
        }
        _ => Ok(()),
    }
}
