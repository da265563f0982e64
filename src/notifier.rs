//! Reminder collaborator.
//!
//! The tracker only asks for reminders to be scheduled or cancelled when
//! a routine's `notifications` / `time` change, and for one-off messages
//! (streaks, finished tasks). Delivery is somebody else's problem.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone};

use crate::models::Routine;

pub trait Notifier {
    fn schedule(&mut self, routine_id: &str, at: NaiveTime);
    fn cancel(&mut self, routine_id: &str);
    fn notify_now(&mut self, title: &str, body: &str);
}

/// Keeps the reminder table in memory and reports through `tracing`.
/// A host UI can poll `pending` to fire reminders itself.
#[derive(Debug, Default)]
pub struct LogNotifier {
    scheduled: BTreeMap<String, NaiveTime>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    // Next firing instant of every scheduled reminder, soonest first.
    pub fn pending(&self, lead_minutes: i64, now: DateTime<FixedOffset>) -> Vec<(String, DateTime<FixedOffset>)> {
        let mut out: Vec<_> = self
            .scheduled
            .iter()
            .filter_map(|(id, at)| next_reminder(*at, lead_minutes, now).map(|t| (id.clone(), t)))
            .collect();
        out.sort_by_key(|(_, t)| *t);
        out
    }
}

impl Notifier for LogNotifier {
    fn schedule(&mut self, routine_id: &str, at: NaiveTime) {
        tracing::info!("reminder for {} scheduled at {}", routine_id, at.format("%H:%M"));
        self.scheduled.insert(routine_id.to_string(), at);
    }

    fn cancel(&mut self, routine_id: &str) {
        if self.scheduled.remove(routine_id).is_some() {
            tracing::info!("reminder for {} cancelled", routine_id);
        }
    }

    fn notify_now(&mut self, title: &str, body: &str) {
        tracing::info!("notification: {} - {}", title, body);
    }
}

// Parse a "HH:MM" string.
pub fn parse_clock(hhmm: &str) -> Option<NaiveTime> {
    let (h, m) = hhmm.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

// The time a reminder should be scheduled for, if the routine wants one.
pub fn reminder_time(routine: &Routine) -> Option<NaiveTime> {
    if !routine.notifications {
        return None;
    }
    routine.time.as_deref().and_then(parse_clock)
}

// Next instant, strictly after `now`, that is `lead_minutes` before `at`
// on some day. Today if still ahead, otherwise tomorrow. `None` when the
// lead is out of chrono's range.
pub fn next_reminder(at: NaiveTime, lead_minutes: i64, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let offset = *now.offset();
    let today = offset
        .from_local_datetime(&now.date_naive().and_time(at))
        .single()?
        .checked_sub_signed(Duration::try_minutes(lead_minutes)?)?;

    if today > now {
        Some(today)
    } else {
        today.checked_add_signed(Duration::days(1))
    }
}
