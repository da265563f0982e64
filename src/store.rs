// Routine collection and completion log.
//
// RoutineStore is the only writer of routines. Every mutation writes the
// full collection back to the key-value store before the in-memory copy
// is replaced, so what `list()` returns is always what is persisted.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::backup;
use crate::error::{Result, TrackerError};
use crate::kv::{self, KeyValueStore};
use crate::models::{
    CompletionEvent, DailyType, FrequencyType, MonthlyType, Routine, RoutineConfig,
};
use crate::notifier;
use crate::recurrence;
use crate::streak::{self, Completion};

pub const ROUTINES_KEY: &str = "routines";
pub const COMPLETIONS_KEY: &str = "completions";

const DEFAULT_ICON: &str = "⭐";
const DEFAULT_CATEGORY: &str = "custom";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineStats {
    pub streak: u32,
    pub longest_streak: u32,
    pub completed_today: bool,
    pub last_completed: Option<DateTime<FixedOffset>>,
    pub total_completions: usize,
}

pub struct RoutineStore<S> {
    kv: S,
    routines: Vec<Routine>,
    completions: Vec<CompletionEvent>,
}

impl<S: KeyValueStore> RoutineStore<S> {
    pub fn open(kv: S) -> Result<Self> {
        let mut store = Self { kv, routines: Vec::new(), completions: Vec::new() };
        store.reload()?;
        Ok(store)
    }

    // Re-read both collections, dropping malformed records.
    pub fn reload(&mut self) -> Result<()> {
        let routines = backup::load_collection(&self.kv, ROUTINES_KEY)?;
        let completions = backup::load_collection(&self.kv, COMPLETIONS_KEY)?;
        self.routines = backup::repair_routines(routines);
        self.completions = backup::repair_completions(completions);
        tracing::debug!(
            "loaded {} routines, {} completions",
            self.routines.len(),
            self.completions.len()
        );
        Ok(())
    }

    fn persist(&self, routines: &[Routine], completions: &[CompletionEvent]) -> Result<()> {
        kv::write_batch(&self.kv, &entries(routines, completions)?)
    }

    fn commit(&mut self, routines: Vec<Routine>, completions: Vec<CompletionEvent>) -> Result<()> {
        self.persist(&routines, &completions)?;
        self.adopt(routines, completions);
        Ok(())
    }

    // Takes over collections that are already on disk.
    pub(crate) fn adopt(&mut self, routines: Vec<Routine>, completions: Vec<CompletionEvent>) {
        self.routines = routines;
        self.completions = completions;
    }

    pub fn create(&mut self, config: RoutineConfig, now: DateTime<FixedOffset>) -> Result<Routine> {
        let name = match config.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => return Err(TrackerError::Validation("name is required".to_string())),
        };
        let Some(frequency_type) = config.frequency_type else {
            return Err(TrackerError::Validation("frequencyType is required".to_string()));
        };

        let mut routine = Routine::new(Uuid::new_v4().to_string(), name, frequency_type);
        routine.icon = DEFAULT_ICON.to_string();
        routine.category = DEFAULT_CATEGORY.to_string();
        routine.notifications = true;
        routine.created_at = Some(now);
        config.apply_to(&mut routine);
        routine.name = routine.name.trim().to_string();
        validate(&routine)?;

        let mut next = self.routines.clone();
        next.push(routine.clone());
        self.commit(next, self.completions.clone())?;

        tracing::info!("created routine {} ({})", routine.id, routine.name);
        Ok(routine)
    }

    pub fn update(&mut self, id: &str, changes: RoutineConfig) -> Result<Routine> {
        let mut next = self.routines.clone();
        let Some(routine) = next.iter_mut().find(|r| r.id == id) else {
            return Err(TrackerError::routine_not_found(id));
        };

        changes.apply_to(routine);
        validate(routine)?;
        let updated = routine.clone();

        self.commit(next, self.completions.clone())?;
        tracing::info!("updated routine {}", id);
        Ok(updated)
    }

    // Removes the routine and its completion history.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        if !self.routines.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let routines = self.routines.iter().filter(|r| r.id != id).cloned().collect();
        let completions = self
            .completions
            .iter()
            .filter(|c| c.routine_id != id)
            .cloned()
            .collect();
        self.commit(routines, completions)?;

        tracing::info!("deleted routine {}", id);
        Ok(true)
    }

    pub fn complete(&mut self, id: &str, now: DateTime<FixedOffset>) -> Result<Completion> {
        let Some(pos) = self.routines.iter().position(|r| r.id == id) else {
            return Err(TrackerError::routine_not_found(id));
        };

        let completion = streak::record_completion(&self.routines[pos], now)?;

        let mut routines = self.routines.clone();
        routines[pos] = completion.routine.clone();
        let mut completions = self.completions.clone();
        completions.push(CompletionEvent { routine_id: id.to_string(), completed_at: now });
        self.commit(routines, completions)?;

        tracing::info!(
            "completed routine {} ({:?}, streak {})",
            id,
            completion.outcome,
            completion.routine.streak
        );
        Ok(completion)
    }

    // Clears `completed` flags left over from a previous day and zeroes
    // streaks whose last completion is more than a day back.
    pub fn roll_over(&mut self, now: DateTime<FixedOffset>) -> Result<()> {
        let mut next = self.routines.clone();
        let mut changed = false;
        for r in next.iter_mut() {
            changed |= streak::roll_over(r, now);
        }
        if changed {
            self.commit(next, self.completions.clone())?;
        }
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    pub fn list(&self) -> &[Routine] {
        &self.routines
    }

    pub fn completions(&self) -> &[CompletionEvent] {
        &self.completions
    }

    pub fn by_category(&self, category: &str) -> Vec<&Routine> {
        self.routines.iter().filter(|r| r.category == category).collect()
    }

    pub fn due_at(&self, at: DateTime<FixedOffset>) -> Vec<&Routine> {
        self.routines
            .iter()
            .filter(|r| recurrence::is_due(r, at))
            .collect()
    }

    // Due at any point of `date`, evaluated at the day's last second.
    pub fn due_on(&self, date: NaiveDate, offset: FixedOffset) -> Vec<&Routine> {
        match recurrence::end_of_day(date, offset) {
            Some(at) => self.due_at(at),
            None => Vec::new(),
        }
    }

    pub fn completed_on(&self, date: NaiveDate, offset: FixedOffset) -> Vec<&Routine> {
        self.routines
            .iter()
            .filter(|r| {
                self.history(&r.id)
                    .any(|at| at.with_timezone(&offset).date_naive() == date)
                    || r.last_completed
                        .is_some_and(|at| at.with_timezone(&offset).date_naive() == date)
            })
            .collect()
    }

    pub fn history<'a>(&'a self, id: &'a str) -> impl Iterator<Item = DateTime<FixedOffset>> + 'a {
        self.completions
            .iter()
            .filter(move |c| c.routine_id == id)
            .map(|c| c.completed_at)
    }

    pub fn stats(&self, id: &str, now: DateTime<FixedOffset>) -> Result<RoutineStats> {
        let routine = self
            .get_by_id(id)
            .ok_or_else(|| TrackerError::routine_not_found(id))?;
        let history: Vec<_> = self.history(id).collect();

        Ok(RoutineStats {
            streak: streak::current_streak(routine, now),
            longest_streak: streak::longest_streak(&history).max(routine.streak),
            completed_today: streak::completed_today(routine, now),
            last_completed: routine.last_completed,
            total_completions: history.len(),
        })
    }
}

// Both collections serialized for one `kv::write_batch`, log first.
pub(crate) fn entries(routines: &[Routine], completions: &[CompletionEvent]) -> Result<Vec<(&'static str, String)>> {
    Ok(vec![
        (COMPLETIONS_KEY, kv::to_json(completions)?),
        (ROUTINES_KEY, kv::to_json(routines)?),
    ])
}

// Range checks for the active recurrence group.
pub fn validate(r: &Routine) -> Result<()> {
    let invalid = |msg: &str| Err(TrackerError::Validation(msg.to_string()));

    if r.name.trim().is_empty() {
        return invalid("name is required");
    }

    match r.frequency_type {
        FrequencyType::Daily => {
            if r.daily_type == Some(DailyType::Custom) && !r.daily_interval.is_some_and(|n| n >= 1) {
                return invalid("dailyInterval must be at least 1");
            }
        }
        FrequencyType::Weekly => {
            let days = r.selected_days.as_deref().unwrap_or_default();
            if days.is_empty() {
                return invalid("selectedDays needs at least one weekday");
            }
            if days.iter().any(|d| *d > 6) {
                return invalid("selectedDays must be 0..=6");
            }
            if r.weekly_interval == Some(0) {
                return invalid("weeklyInterval must be at least 1");
            }
        }
        FrequencyType::Monthly => match r.monthly_type.unwrap_or_default() {
            MonthlyType::ByDate => {
                if !r.monthly_date.is_some_and(|d| (1..=31).contains(&d)) {
                    return invalid("monthlyDate must be 1..=31");
                }
            }
            MonthlyType::ByWeekday => {
                if r.monthly_week_order.is_none() {
                    return invalid("monthlyWeekOrder is required");
                }
                if !r.monthly_week_day.is_some_and(|d| d <= 6) {
                    return invalid("monthlyWeekDay must be 0..=6");
                }
            }
        },
        FrequencyType::Yearly => {
            if !r.yearly_month.is_some_and(|m| m <= 11) {
                return invalid("yearlyMonth must be 0..=11");
            }
            if !r.yearly_date.is_some_and(|d| (1..=31).contains(&d)) {
                return invalid("yearlyDate must be 1..=31");
            }
        }
        FrequencyType::Interval => {
            if !r.interval_number.is_some_and(|n| n > 0) {
                return invalid("intervalNumber must be positive");
            }
            if r.interval_unit.is_none() {
                return invalid("intervalUnit is required");
            }
        }
        FrequencyType::Unknown => return invalid("unsupported frequencyType"),
    }

    if let Some(time) = &r.time {
        if notifier::parse_clock(time).is_none() {
            return invalid("time must be HH:MM");
        }
    }

    Ok(())
}
