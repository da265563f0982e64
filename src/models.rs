use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Interval,
    // Anything unrecognised in stored data; evaluated as "always due"
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DailyType {
    #[default]
    Everyday,
    Weekdays,
    Weekends,
    Custom,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MonthlyType {
    #[default]
    ByDate,
    ByWeekday,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WeekOrder {
    First,
    Second,
    Third,
    Last,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IntervalUnit {
    Hours,
    Days,
    Weeks,
}

impl IntervalUnit {
    pub fn seconds(self) -> i64 {
        match self {
            IntervalUnit::Hours => 3_600,
            IntervalUnit::Days => 86_400,
            IntervalUnit::Weeks => 604_800,
        }
    }
}

// A recurring habit definition.
//
// The recurrence parameters are stored flat (matching the export
// document); only the group selected by `frequency_type` is meaningful.
// Use `Routine::recurrence()` to get the typed view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category: String,
    pub frequency_type: FrequencyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_type: Option<DailyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_interval: Option<u32>, // days, >= 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_days: Option<Vec<u8>>, // 0 = Sunday .. 6 = Saturday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_type: Option<MonthlyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_date: Option<u32>, // 1..=31
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_week_order: Option<WeekOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_week_day: Option<u8>, // 0..=6
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_month: Option<u32>, // 0..=11
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_date: Option<u32>, // 1..=31
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_unit: Option<IntervalUnit>,

    #[serde(default)]
    pub notifications: bool,
    #[serde(default)]
    pub time: Option<String>, // "HH:MM", reminder only
    #[serde(default)]
    pub last_completed: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
}

// Typed view of the active recurrence group.
#[derive(Debug, Clone, PartialEq)]
pub enum Recurrence {
    Always,
    Never,
    Weekdays,
    Weekends,
    EveryNDays(u32),
    Weekly { days: Vec<u8>, every_weeks: u32 },
    MonthlyByDate(u32),
    MonthlyByWeekday { order: WeekOrder, weekday: u8 },
    Yearly { month: u32, day: u32 },
    Interval { seconds: i64 },
}

impl Routine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, frequency_type: FrequencyType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            category: String::new(),
            frequency_type,
            daily_type: None,
            daily_interval: None,
            selected_days: None,
            weekly_interval: None,
            monthly_type: None,
            monthly_date: None,
            monthly_week_order: None,
            monthly_week_day: None,
            yearly_month: None,
            yearly_date: None,
            interval_number: None,
            interval_unit: None,
            notifications: false,
            time: None,
            last_completed: None,
            streak: 0,
            completed: false,
            created_at: None,
        }
    }

    // Incomplete parameter groups never match, except that a missing
    // daily / monthly sub-type falls back to everyday / by-date.
    pub fn recurrence(&self) -> Recurrence {
        match self.frequency_type {
            FrequencyType::Daily => match self.daily_type.unwrap_or_default() {
                DailyType::Everyday => Recurrence::Always,
                DailyType::Weekdays => Recurrence::Weekdays,
                DailyType::Weekends => Recurrence::Weekends,
                DailyType::Custom => match self.daily_interval {
                    Some(n) if n >= 1 => Recurrence::EveryNDays(n),
                    _ => Recurrence::Never,
                },
            },
            FrequencyType::Weekly => Recurrence::Weekly {
                days: self.selected_days.clone().unwrap_or_default(),
                every_weeks: self.weekly_interval.unwrap_or(1).max(1),
            },
            FrequencyType::Monthly => match self.monthly_type.unwrap_or_default() {
                MonthlyType::ByDate => match self.monthly_date {
                    Some(d) => Recurrence::MonthlyByDate(d),
                    None => Recurrence::Never,
                },
                MonthlyType::ByWeekday => match (self.monthly_week_order, self.monthly_week_day) {
                    (Some(order), Some(weekday)) => Recurrence::MonthlyByWeekday { order, weekday },
                    _ => Recurrence::Never,
                },
            },
            FrequencyType::Yearly => match (self.yearly_month, self.yearly_date) {
                (Some(month), Some(day)) => Recurrence::Yearly { month, day },
                _ => Recurrence::Never,
            },
            FrequencyType::Interval => match (self.interval_number, self.interval_unit) {
                (Some(n), Some(unit)) if n > 0 => Recurrence::Interval {
                    seconds: i64::from(n) * unit.seconds(),
                },
                _ => Recurrence::Never,
            },
            FrequencyType::Unknown => Recurrence::Always,
        }
    }
}

// Create input and partial update for a routine.
// On create `name` and `frequency_type` are required; on update every
// present field overwrites the stored one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub frequency_type: Option<FrequencyType>,
    pub daily_type: Option<DailyType>,
    pub daily_interval: Option<u32>,
    pub selected_days: Option<Vec<u8>>,
    pub weekly_interval: Option<u32>,
    pub monthly_type: Option<MonthlyType>,
    pub monthly_date: Option<u32>,
    pub monthly_week_order: Option<WeekOrder>,
    pub monthly_week_day: Option<u8>,
    pub yearly_month: Option<u32>,
    pub yearly_date: Option<u32>,
    pub interval_number: Option<u32>,
    pub interval_unit: Option<IntervalUnit>,
    pub notifications: Option<bool>,
    pub time: Option<String>,
}

impl RoutineConfig {
    pub fn apply_to(self, r: &mut Routine) {
        if let Some(v) = self.name { r.name = v; }
        if let Some(v) = self.description { r.description = v; }
        if let Some(v) = self.icon { r.icon = v; }
        if let Some(v) = self.category { r.category = v; }
        if let Some(v) = self.frequency_type { r.frequency_type = v; }
        if self.daily_type.is_some() { r.daily_type = self.daily_type; }
        if self.daily_interval.is_some() { r.daily_interval = self.daily_interval; }
        if self.selected_days.is_some() { r.selected_days = self.selected_days; }
        if self.weekly_interval.is_some() { r.weekly_interval = self.weekly_interval; }
        if self.monthly_type.is_some() { r.monthly_type = self.monthly_type; }
        if self.monthly_date.is_some() { r.monthly_date = self.monthly_date; }
        if self.monthly_week_order.is_some() { r.monthly_week_order = self.monthly_week_order; }
        if self.monthly_week_day.is_some() { r.monthly_week_day = self.monthly_week_day; }
        if self.yearly_month.is_some() { r.yearly_month = self.yearly_month; }
        if self.yearly_date.is_some() { r.yearly_date = self.yearly_date; }
        if self.interval_number.is_some() { r.interval_number = self.interval_number; }
        if self.interval_unit.is_some() { r.interval_unit = self.interval_unit; }
        if let Some(v) = self.notifications { r.notifications = v; }
        if self.time.is_some() { r.time = self.time; }
    }
}

// One successful completion. Append-only; the exact per-day history
// that `last_completed` alone cannot give.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub routine_id: String,
    pub completed_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

// Ad-hoc calendar item. No recurrence, no streak.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub notifications: bool,
    pub streak_notifications: bool,
    pub achievement_notifications: bool,
    pub reminder_lead_minutes: i64,
}

// Reminders can fire at most a day ahead of the routine's time.
pub const MAX_REMINDER_LEAD_MINUTES: i64 = 24 * 60;

impl Settings {
    pub fn lead_in_range(&self) -> bool {
        (0..=MAX_REMINDER_LEAD_MINUTES).contains(&self.reminder_lead_minutes)
    }

    // For values read back from disk or an import document.
    pub fn clamped(mut self) -> Self {
        if !self.lead_in_range() {
            tracing::warn!(
                "reminder lead of {} minutes out of range, clamping",
                self.reminder_lead_minutes
            );
            self.reminder_lead_minutes = self.reminder_lead_minutes.clamp(0, MAX_REMINDER_LEAD_MINUTES);
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications: true,
            streak_notifications: true,
            achievement_notifications: true,
            reminder_lead_minutes: 5,
        }
    }
}

// Full-state serialization document used for export / import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub routines: Vec<Routine>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completions: Vec<CompletionEvent>,
    pub progress: serde_json::Value,
    #[serde(default)]
    pub settings: Settings,
    pub version: String,
    pub last_updated: DateTime<FixedOffset>,
}
