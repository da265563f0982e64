/*
Progress aggregation.
Walks calendar days, asks the recurrence engine which routines were due
and checks the completion log for which of those were done.
*/

use std::borrow::Cow;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::models::{CompletionEvent, Routine};
use crate::recurrence;
use crate::streak;

// Estimated effort per completed routine, for the daily summary
pub const MINUTES_PER_ROUTINE: u32 = 15;

// Badge thresholds.
pub const HABIT_MASTER_COMPLETIONS: usize = 100;
pub const CONSISTENCY_HERO_DAYS: u32 = 20;
pub const CHAIN_MASTER_DAYS: u32 = 7;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayProgress {
    pub date: NaiveDate,
    pub due: usize,
    pub completed: usize,
    pub rate: f64, // 0.0..=1.0
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodProgress {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayProgress>,
    pub total_due: usize,
    pub total_completed: usize,
    pub rate: f64,
    pub longest_streak: u32,  // consecutive days with at least one completion
    pub successful_days: u32, // days with at least one completion
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineProgress {
    pub id: String,
    pub name: String,
    pub streak: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(flatten)]
    pub progress: DayProgress,
    pub active_streaks: usize,
    pub estimated_minutes: u32,
    pub routines: Vec<RoutineProgress>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    HabitMaster,     // 100+ completions
    ConsistencyHero, // 20+ successful days
    ChainMaster,     // 7+ day chain
}

pub struct ProgressAggregator<'a> {
    routines: &'a [Routine],
    completions: &'a [CompletionEvent],
    offset: FixedOffset,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(routines: &'a [Routine], completions: &'a [CompletionEvent], offset: FixedOffset) -> Self {
        Self { routines, completions, offset }
    }

    fn local_date(&self, at: DateTime<FixedOffset>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    // The routine as it stood at the start of `date`: last completion is
    // the newest logged one before that day. Without a log entry, a stored
    // `last_completed` on or after `date` is ignored.
    fn as_of<'r>(&self, routine: &'r Routine, date: NaiveDate) -> Cow<'r, Routine> {
        let logged = self
            .completions
            .iter()
            .filter(|c| c.routine_id == routine.id && self.local_date(c.completed_at) < date)
            .map(|c| c.completed_at)
            .max();
        let stored = routine.last_completed.filter(|at| self.local_date(*at) < date);
        let last = logged.max(stored);

        if last == routine.last_completed {
            Cow::Borrowed(routine)
        } else {
            let mut r = routine.clone();
            r.last_completed = last;
            Cow::Owned(r)
        }
    }

    pub fn due_routines(&self, date: NaiveDate) -> Vec<&'a Routine> {
        let Some(at) = recurrence::end_of_day(date, self.offset) else {
            return Vec::new();
        };
        self.routines
            .iter()
            .filter(|r| recurrence::is_due(&self.as_of(r, date), at))
            .collect()
    }

    fn done_on(&self, routine: &Routine, date: NaiveDate) -> bool {
        self.completions
            .iter()
            .any(|c| c.routine_id == routine.id && self.local_date(c.completed_at) == date)
            || routine
                .last_completed
                .is_some_and(|at| self.local_date(at) == date)
    }

    pub fn completed_on(&self, date: NaiveDate) -> Vec<&'a Routine> {
        self.due_routines(date)
            .into_iter()
            .filter(|r| self.done_on(r, date))
            .collect()
    }

    pub fn day(&self, date: NaiveDate) -> DayProgress {
        let due = self.due_routines(date);
        let completed = due.iter().filter(|r| self.done_on(r, date)).count();
        DayProgress {
            date,
            due: due.len(),
            completed,
            rate: completion_rate(completed, due.len()),
        }
    }

    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> PeriodProgress {
        let days: Vec<DayProgress> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| self.day(d))
            .collect();

        let total_due: usize = days.iter().map(|d| d.due).sum();
        let total_completed: usize = days.iter().map(|d| d.completed).sum();
        let successful_days = days.iter().filter(|d| d.completed > 0).count() as u32;
        let longest_streak = longest_run(&days);

        let mut period = PeriodProgress {
            start,
            end,
            days,
            total_due,
            total_completed,
            rate: completion_rate(total_completed, total_due),
            longest_streak,
            successful_days,
            achievements: Vec::new(),
        };
        period.achievements = achievements(&period);
        period
    }

    // Monday through Sunday around `date`.
    pub fn week(&self, date: NaiveDate) -> PeriodProgress {
        let start = week_start(date);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
        self.range(start, end)
    }

    pub fn month(&self, date: NaiveDate) -> PeriodProgress {
        let start = date.with_day(1).unwrap_or(date);
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(date);
        self.range(start, end)
    }

    // Routines whose streak is still alive at the end of `date`.
    pub fn active_streaks(&self, date: NaiveDate) -> usize {
        let Some(at) = recurrence::end_of_day(date, self.offset) else {
            return 0;
        };
        self.routines
            .iter()
            .filter(|r| streak::current_streak(r, at) > 0)
            .count()
    }

    pub fn daily_report(&self, date: NaiveDate) -> DailyReport {
        let progress = self.day(date);
        let end = recurrence::end_of_day(date, self.offset);
        let routines: Vec<RoutineProgress> = self
            .due_routines(date)
            .into_iter()
            .map(|r| RoutineProgress {
                id: r.id.clone(),
                name: r.name.clone(),
                streak: end.map_or(r.streak, |at| streak::current_streak(r, at)),
                completed: self.done_on(r, date),
            })
            .collect();

        DailyReport {
            estimated_minutes: progress.completed as u32 * MINUTES_PER_ROUTINE,
            progress,
            active_streaks: self.active_streaks(date),
            routines,
        }
    }
}

pub fn completion_rate(completed: usize, due: usize) -> f64 {
    if due == 0 {
        0.0
    } else {
        completed as f64 / due as f64
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

pub fn longest_run(days: &[DayProgress]) -> u32 {
    let mut current = 0;
    let mut longest = 0;
    for d in days {
        if d.completed > 0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

pub fn achievements(p: &PeriodProgress) -> Vec<Achievement> {
    let mut out = Vec::new();
    if p.total_completed >= HABIT_MASTER_COMPLETIONS {
        out.push(Achievement::HabitMaster);
    }
    if p.successful_days >= CONSISTENCY_HERO_DAYS {
        out.push(Achievement::ConsistencyHero);
    }
    if p.longest_streak >= CHAIN_MASTER_DAYS {
        out.push(Achievement::ChainMaster);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrequencyType, IntervalUnit};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn done(id: &str, s: &str) -> CompletionEvent {
        CompletionEvent { routine_id: id.into(), completed_at: at(s) }
    }

    fn weekly(id: &str, days: Vec<u8>) -> Routine {
        let mut r = Routine::new(id, id, FrequencyType::Weekly);
        r.selected_days = Some(days);
        r
    }

    #[test]
    fn rate_is_zero_without_due_routines() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 4), 0.25);

        let agg = ProgressAggregator::new(&[], &[], utc());
        let d = agg.day(ymd(2024, 1, 1));
        assert_eq!((d.due, d.completed, d.rate), (0, 0, 0.0));
    }

    #[test]
    fn day_counts_due_and_completed_from_the_log() {
        let mut read = Routine::new("read", "Read", FrequencyType::Daily);
        read.last_completed = Some(at("2024-01-03T09:00:00Z"));
        let gym = weekly("gym", vec![1, 3]); // mon, wed
        let routines = vec![read, gym];
        let log = vec![
            done("read", "2024-01-01T09:00:00Z"),
            done("gym", "2024-01-01T18:00:00Z"),
            done("read", "2024-01-03T09:00:00Z"),
        ];
        let agg = ProgressAggregator::new(&routines, &log, utc());

        let mon = agg.day(ymd(2024, 1, 1));
        assert_eq!((mon.due, mon.completed), (2, 2));
        assert_eq!(mon.rate, 1.0);

        let tue = agg.day(ymd(2024, 1, 2));
        assert_eq!((tue.due, tue.completed), (1, 0));

        let wed = agg.day(ymd(2024, 1, 3));
        assert_eq!((wed.due, wed.completed), (2, 1));
        assert_eq!(agg.completed_on(ymd(2024, 1, 3))[0].id, "read");
    }

    #[test]
    fn completions_on_days_not_due_are_not_counted() {
        let routines = vec![weekly("gym", vec![1])];
        let log = vec![done("gym", "2024-01-02T18:00:00Z")]; // tuesday
        let agg = ProgressAggregator::new(&routines, &log, utc());
        let d = agg.day(ymd(2024, 1, 2));
        assert_eq!((d.due, d.completed), (0, 0));
    }

    #[test]
    fn interval_routines_use_state_before_the_day() {
        let mut water = Routine::new("water", "Water", FrequencyType::Interval);
        water.interval_number = Some(2);
        water.interval_unit = Some(IntervalUnit::Days);
        water.last_completed = Some(at("2024-01-03T08:00:00Z"));
        let routines = vec![water];
        let log = vec![
            done("water", "2024-01-01T08:00:00Z"),
            done("water", "2024-01-03T08:00:00Z"),
        ];
        let agg = ProgressAggregator::new(&routines, &log, utc());

        assert_eq!(agg.day(ymd(2024, 1, 1)).completed, 1);
        assert_eq!(agg.day(ymd(2024, 1, 2)).due, 0);
        let d = agg.day(ymd(2024, 1, 3));
        assert_eq!((d.due, d.completed), (1, 1));
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        assert_eq!(week_start(ymd(2024, 1, 3)), ymd(2024, 1, 1));
        assert_eq!(week_start(ymd(2024, 1, 7)), ymd(2024, 1, 1));
        assert_eq!(week_start(ymd(2024, 1, 8)), ymd(2024, 1, 8));

        let routines = vec![Routine::new("read", "Read", FrequencyType::Daily)];
        let log = vec![
            done("read", "2024-01-01T09:00:00Z"),
            done("read", "2024-01-02T09:00:00Z"),
            done("read", "2024-01-04T09:00:00Z"),
            done("read", "2024-01-05T09:00:00Z"),
            done("read", "2024-01-06T09:00:00Z"),
        ];
        let agg = ProgressAggregator::new(&routines, &log, utc());

        let w = agg.week(ymd(2024, 1, 4));
        assert_eq!(w.start, ymd(2024, 1, 1));
        assert_eq!(w.end, ymd(2024, 1, 7));
        assert_eq!(w.days.len(), 7);
        assert_eq!((w.total_due, w.total_completed), (7, 5));
        assert_eq!(w.longest_streak, 3);
        assert_eq!(w.successful_days, 5);
        assert!(w.achievements.is_empty());
    }

    #[test]
    fn month_covers_calendar_month_and_awards_badges() {
        let routines = vec![Routine::new("read", "Read", FrequencyType::Daily)];
        let log: Vec<_> = (1..=21)
            .map(|d| done("read", &format!("2024-02-{d:02}T07:00:00Z")))
            .collect();
        let agg = ProgressAggregator::new(&routines, &log, utc());

        let m = agg.month(ymd(2024, 2, 14));
        assert_eq!(m.start, ymd(2024, 2, 1));
        assert_eq!(m.end, ymd(2024, 2, 29));
        assert_eq!(m.total_due, 29);
        assert_eq!(m.total_completed, 21);
        assert_eq!(m.longest_streak, 21);
        assert_eq!(m.achievements, vec![Achievement::ConsistencyHero, Achievement::ChainMaster]);
    }

    #[test]
    fn longest_run_resets_on_empty_days() {
        let day = |completed| DayProgress { date: ymd(2024, 1, 1), due: 1, completed, rate: 0.0 };
        let days = [day(1), day(1), day(0), day(1), day(2), day(1), day(0)];
        assert_eq!(longest_run(&days), 3);
    }

    #[test]
    fn daily_report_summarises_today() {
        let mut read = Routine::new("read", "Read", FrequencyType::Daily);
        read.streak = 4;
        read.last_completed = Some(at("2024-01-02T09:00:00Z"));
        let mut walk = Routine::new("walk", "Walk", FrequencyType::Daily);
        walk.streak = 0;
        let routines = vec![read, walk];
        let agg = ProgressAggregator::new(&routines, &[], utc());

        let report = agg.daily_report(ymd(2024, 1, 2));
        assert_eq!(report.progress.completed, 1);
        assert_eq!(report.active_streaks, 1);
        assert_eq!(report.estimated_minutes, MINUTES_PER_ROUTINE);
        assert_eq!(report.routines.len(), 2);
        assert!(report.routines[0].completed);
        assert!(!report.routines[1].completed);

        // ten idle days later the chain is gone
        let later = agg.daily_report(ymd(2024, 1, 12));
        assert_eq!(later.active_streaks, 0);
        assert_eq!(later.routines[0].streak, 0);
    }

    #[test]
    fn reports_use_camel_case_keys() {
        let routines = vec![Routine::new("read", "Read", FrequencyType::Daily)];
        let agg = ProgressAggregator::new(&routines, &[], utc());

        let week = serde_json::to_value(agg.week(ymd(2024, 1, 3))).unwrap();
        assert!(week.get("totalDue").is_some());
        assert!(week.get("longestStreak").is_some());
        assert!(week.get("total_due").is_none());

        let daily = serde_json::to_value(agg.daily_report(ymd(2024, 1, 3))).unwrap();
        assert!(daily.get("activeStreaks").is_some());
        assert!(daily.get("estimatedMinutes").is_some());
    }
}
