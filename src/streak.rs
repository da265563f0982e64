//! Streak bookkeeping for routine completions.
//!
//! A routine can be completed at most once per calendar day. The gap
//! between two completions is the number of calendar days between them,
//! taken in the offset of the newer completion:
//!
//! - gap of 1 day continues the streak,
//! - gap of 2+ days restarts it at 1 (the completion still counts),
//! - a gap below 1 can only come from clock skew and is treated as 1.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::{Result, TrackerError};
use crate::models::Routine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Counted as consecutive although the previous completion lies in the future
    Completed,
    StreakContinued,
    StreakReset,
    StreakStarted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub routine: Routine,
    pub outcome: CompletionOutcome,
}

pub fn same_calendar_day(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> bool {
    a.with_timezone(b.offset()).date_naive() == b.date_naive()
}

// Calendar days from `last` to `now`, both seen in `now`'s offset.
pub fn gap_days(last: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> i64 {
    let last_day = last.with_timezone(now.offset()).date_naive();
    (now.date_naive() - last_day).num_days()
}

pub fn completed_today(routine: &Routine, now: DateTime<FixedOffset>) -> bool {
    routine
        .last_completed
        .is_some_and(|last| same_calendar_day(last, now))
}

/// Apply one completion at `now`. The input routine is left untouched;
/// on `AlreadyCompleted` nothing changes.
pub fn record_completion(routine: &Routine, now: DateTime<FixedOffset>) -> Result<Completion> {
    if completed_today(routine, now) {
        return Err(TrackerError::AlreadyCompleted(routine.id.clone()));
    }

    let mut updated = routine.clone();
    let outcome = match routine.last_completed {
        None => {
            updated.streak = 1;
            CompletionOutcome::StreakStarted
        }
        Some(last) => match gap_days(last, now) {
            1 => {
                updated.streak = routine.streak.saturating_add(1);
                CompletionOutcome::StreakContinued
            }
            g if g > 1 => {
                updated.streak = 1;
                CompletionOutcome::StreakReset
            }
            _ => {
                updated.streak = routine.streak.saturating_add(1);
                CompletionOutcome::Completed
            }
        },
    };

    updated.last_completed = Some(now);
    updated.completed = true;

    Ok(Completion { routine: updated, outcome })
}

/// The streak as it stands at `now`: zero once a full calendar day has
/// passed without a completion.
pub fn current_streak(routine: &Routine, now: DateTime<FixedOffset>) -> u32 {
    match routine.last_completed {
        Some(last) if gap_days(last, now) <= 1 => routine.streak,
        _ => 0,
    }
}

/// Bring the stored flags up to `now`: `completed` only holds on the
/// completion day and a broken streak drops to zero.
/// Returns true if anything changed.
pub fn roll_over(routine: &mut Routine, now: DateTime<FixedOffset>) -> bool {
    let completed = completed_today(routine, now);
    let streak = current_streak(routine, now);
    if routine.completed == completed && routine.streak == streak {
        return false;
    }
    routine.completed = completed;
    routine.streak = streak;
    true
}

/// Longest streak reachable by replaying a completion history in order.
/// Same-day duplicates are ignored the same way `record_completion`
/// rejects them.
pub fn longest_streak(history: &[DateTime<FixedOffset>]) -> u32 {
    let mut sorted = history.to_vec();
    sorted.sort();

    let mut replay = Routine::new("", "", crate::models::FrequencyType::Daily);
    let mut best = 0;
    for at in sorted {
        if let Ok(c) = record_completion(&replay, at) {
            replay = c.routine;
            best = best.max(replay.streak);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FrequencyType;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn routine_with(streak: u32, last: Option<&str>) -> Routine {
        let mut r = Routine::new("r1", "Read", FrequencyType::Daily);
        r.streak = streak;
        r.last_completed = last.map(at);
        r
    }

    #[test]
    fn first_completion_starts_streak() {
        let c = record_completion(&routine_with(0, None), at("2024-01-01T09:00:00Z")).unwrap();
        assert_eq!(c.outcome, CompletionOutcome::StreakStarted);
        assert_eq!(c.routine.streak, 1);
        assert!(c.routine.completed);
        assert_eq!(c.routine.last_completed, Some(at("2024-01-01T09:00:00Z")));
    }

    #[test]
    fn next_day_continues_at_any_time() {
        let r = routine_with(5, Some("2024-01-01T06:00:00Z"));
        let c = record_completion(&r, at("2024-01-02T23:30:00Z")).unwrap();
        assert_eq!(c.outcome, CompletionOutcome::StreakContinued);
        assert_eq!(c.routine.streak, 6);

        let r = routine_with(5, Some("2024-01-01T23:50:00Z"));
        let c = record_completion(&r, at("2024-01-02T00:10:00Z")).unwrap();
        assert_eq!(c.routine.streak, 6);
    }

    #[test]
    fn gap_of_several_days_resets() {
        let r = routine_with(5, Some("2024-01-01T09:00:00Z"));
        let c = record_completion(&r, at("2024-01-05T09:00:00Z")).unwrap();
        assert_eq!(c.outcome, CompletionOutcome::StreakReset);
        assert_eq!(c.routine.streak, 1);

        let c = record_completion(&r, at("2024-01-04T08:00:00Z")).unwrap();
        assert_eq!(c.routine.streak, 1);
    }

    #[test]
    fn same_day_completion_is_rejected() {
        let r = routine_with(3, Some("2024-01-01T07:00:00Z"));
        let err = record_completion(&r, at("2024-01-01T21:00:00Z")).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyCompleted(id) if id == "r1"));
        assert_eq!(r.streak, 3);
        assert_eq!(r.last_completed, Some(at("2024-01-01T07:00:00Z")));
    }

    #[test]
    fn calendar_day_is_taken_in_the_new_offset() {
        // 22:00Z on Jan 1 is already Jan 2 at +03:00
        let r = routine_with(1, Some("2024-01-01T22:00:00Z"));
        let err = record_completion(&r, at("2024-01-02T10:00:00+03:00"));
        assert!(err.is_err());
    }

    #[test]
    fn clock_skew_is_treated_as_consecutive() {
        let r = routine_with(2, Some("2024-01-03T09:00:00Z"));
        let c = record_completion(&r, at("2024-01-01T09:00:00Z")).unwrap();
        assert_eq!(c.outcome, CompletionOutcome::Completed);
        assert_eq!(c.routine.streak, 3);
    }

    #[test]
    fn stale_completed_flag_is_cleared() {
        let mut r = routine_with(1, Some("2024-01-01T09:00:00Z"));
        r.completed = true;
        assert!(!roll_over(&mut r, at("2024-01-01T20:00:00Z")));
        assert!(r.completed);
        assert!(roll_over(&mut r, at("2024-01-02T08:00:00Z")));
        assert!(!r.completed);
        assert_eq!(r.streak, 1);
    }

    #[test]
    fn broken_streak_drops_to_zero() {
        let mut r = routine_with(4, Some("2024-01-01T09:00:00Z"));
        assert_eq!(current_streak(&r, at("2024-01-02T23:00:00Z")), 4);
        assert_eq!(current_streak(&r, at("2024-01-03T00:30:00Z")), 0);

        assert!(roll_over(&mut r, at("2024-01-11T09:00:00Z")));
        assert_eq!(r.streak, 0);
        assert!(!roll_over(&mut r, at("2024-01-12T09:00:00Z")));

        // the next completion starts over
        let c = record_completion(&r, at("2024-01-12T09:00:00Z")).unwrap();
        assert_eq!(c.outcome, CompletionOutcome::StreakReset);
        assert_eq!(c.routine.streak, 1);

        assert_eq!(current_streak(&routine_with(0, None), at("2024-01-01T09:00:00Z")), 0);
    }

    #[test]
    fn longest_streak_over_history() {
        let history = vec![
            at("2024-01-05T09:00:00Z"),
            at("2024-01-01T09:00:00Z"),
            at("2024-01-02T09:00:00Z"),
            at("2024-01-02T18:00:00Z"),
            at("2024-01-03T09:00:00Z"),
            at("2024-01-06T09:00:00Z"),
        ];
        assert_eq!(longest_streak(&history), 3);
        assert_eq!(longest_streak(&[]), 0);
    }
}
