/*
Due-date evaluation.
Pure functions only: the same routine + instant always gives the same
answer, so this is shared by the dashboard ("what is due now") and by
retrospective aggregation over past dates.
*/

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};

use crate::models::{Recurrence, Routine, WeekOrder};

// Is `routine` due at `at`?
//
// Calendar rules compare at day granularity using the date of `at` in
// its own offset. Custom-day and interval rules measure the elapsed time
// since `last_completed`.
//
// `weekly_interval` is not applied: weekly routines are due on every
// selected weekday.
pub fn is_due(routine: &Routine, at: DateTime<FixedOffset>) -> bool {
    let date = at.date_naive();

    match routine.recurrence() {
        Recurrence::Always => true,
        Recurrence::Never => false,
        Recurrence::Weekdays => !is_weekend(date),
        Recurrence::Weekends => is_weekend(date),
        Recurrence::EveryNDays(n) => match routine.last_completed {
            None => true,
            Some(last) => (at - last).num_days() >= i64::from(n),
        },
        Recurrence::Weekly { days, .. } => days.contains(&weekday_index(date)),
        // Months shorter than the configured date are skipped, no clamping
        Recurrence::MonthlyByDate(day) => date.day() == day,
        Recurrence::MonthlyByWeekday { order, weekday } => {
            weekday_index(date) == weekday && week_order_matches(date, order)
        }
        Recurrence::Yearly { month, day } => date.month0() == month && date.day() == day,
        Recurrence::Interval { seconds } => match routine.last_completed {
            None => true,
            Some(last) => (at - last).num_seconds() >= seconds,
        },
    }
}

// Every date in `from..=to` on which the routine is due, evaluated at the
// end of each day with the routine's current completion state.
pub fn due_dates(
    routine: &Routine,
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| end_of_day(*d, offset).is_some_and(|at| is_due(routine, at)))
        .collect()
}

// 0 = Sunday .. 6 = Saturday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// Is `date` the first / second / third / last occurrence of its weekday
// within its month?
fn week_order_matches(date: NaiveDate, order: WeekOrder) -> bool {
    let day = date.day();
    match order {
        WeekOrder::First => day <= 7,
        WeekOrder::Second => (8..=14).contains(&day),
        WeekOrder::Third => (15..=21).contains(&day),
        WeekOrder::Last => date
            .checked_add_days(Days::new(7))
            .is_none_or(|next| next.month() != date.month()),
    }
}

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.from_local_datetime(&date.and_time(NaiveTime::MIN)).single()
}

pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(23, 59, 59)?;
    offset.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyType, FrequencyType, IntervalUnit, MonthlyType};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        utc().from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap()).unwrap()
    }

    fn daily(kind: DailyType) -> Routine {
        let mut r = Routine::new("r", "Routine", FrequencyType::Daily);
        r.daily_type = Some(kind);
        r
    }

    #[test]
    fn everyday_is_always_due() {
        let r = daily(DailyType::Everyday);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for d in start.iter_days().take(400) {
            assert!(is_due(&r, end_of_day(d, utc()).unwrap()), "{d}");
        }
    }

    #[test]
    fn missing_daily_type_means_everyday() {
        let r = Routine::new("r", "Routine", FrequencyType::Daily);
        assert!(is_due(&r, noon(2024, 1, 6)));
    }

    #[test]
    fn weekdays_and_weekends_split_the_week() {
        let weekdays = daily(DailyType::Weekdays);
        let weekends = daily(DailyType::Weekends);

        // 2024-01-01 is a Monday
        for d in 1..=5 {
            assert!(is_due(&weekdays, noon(2024, 1, d)));
            assert!(!is_due(&weekends, noon(2024, 1, d)));
        }
        for d in 6..=7 {
            assert!(!is_due(&weekdays, noon(2024, 1, d)));
            assert!(is_due(&weekends, noon(2024, 1, d)));
        }
    }

    #[test]
    fn custom_daily_interval_counts_whole_days() {
        let mut r = daily(DailyType::Custom);
        r.daily_interval = Some(3);
        assert!(is_due(&r, noon(2024, 1, 1)), "never completed");

        r.last_completed = Some(at("2024-01-01T12:00:00Z"));
        assert!(!is_due(&r, at("2024-01-04T11:59:00Z")));
        assert!(is_due(&r, at("2024-01-04T12:00:00Z")));
    }

    #[test]
    fn weekly_matches_selected_days() {
        let mut r = Routine::new("r", "Cleaning", FrequencyType::Weekly);
        r.selected_days = Some(vec![1, 3, 5]);

        assert!(!is_due(&r, noon(2024, 1, 2)), "tuesday");
        assert!(is_due(&r, noon(2024, 1, 3)), "wednesday");

        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        for d in start.iter_days().take(60) {
            let expected = [1, 3, 5].contains(&weekday_index(d));
            assert_eq!(is_due(&r, end_of_day(d, utc()).unwrap()), expected, "{d}");
        }
    }

    #[test]
    fn weekly_interval_does_not_skip_weeks() {
        let mut r = Routine::new("r", "Biweekly", FrequencyType::Weekly);
        r.selected_days = Some(vec![1]);
        r.weekly_interval = Some(2);
        assert!(is_due(&r, noon(2024, 1, 1)));
        assert!(is_due(&r, noon(2024, 1, 8)));
    }

    #[test]
    fn weekly_without_days_is_never_due() {
        let r = Routine::new("r", "Empty", FrequencyType::Weekly);
        assert!(!is_due(&r, noon(2024, 1, 1)));
    }

    #[test]
    fn monthly_by_date_skips_short_months() {
        let mut r = Routine::new("r", "Rent", FrequencyType::Monthly);
        r.monthly_type = Some(MonthlyType::ByDate);
        r.monthly_date = Some(31);

        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            due_dates(&r, jan, feb, utc()),
            vec![NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()]
        );
    }

    #[test]
    fn monthly_by_date_hits_once_per_month() {
        let mut r = Routine::new("r", "Bills", FrequencyType::Monthly);
        r.monthly_date = Some(15);

        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let dates = due_dates(&r, from, to, utc());
        assert_eq!(dates.len(), 12);
        assert!(dates.iter().all(|d| d.day() == 15));
    }

    #[test]
    fn monthly_by_weekday_orders() {
        let mut r = Routine::new("r", "Review", FrequencyType::Monthly);
        r.monthly_type = Some(MonthlyType::ByWeekday);

        r.monthly_week_order = Some(WeekOrder::Second);
        r.monthly_week_day = Some(2); // tuesday
        assert!(!is_due(&r, noon(2024, 1, 2)));
        assert!(is_due(&r, noon(2024, 1, 9)));
        assert!(!is_due(&r, noon(2024, 1, 16)));

        r.monthly_week_order = Some(WeekOrder::Last);
        r.monthly_week_day = Some(3); // wednesday
        assert!(!is_due(&r, noon(2024, 1, 24)));
        assert!(is_due(&r, noon(2024, 1, 31)));

        r.monthly_week_order = Some(WeekOrder::First);
        r.monthly_week_day = Some(1);
        assert!(is_due(&r, noon(2024, 1, 1)));
        assert!(!is_due(&r, noon(2024, 1, 8)));
    }

    #[test]
    fn yearly_uses_zero_based_month() {
        let mut r = Routine::new("r", "Checkup", FrequencyType::Yearly);
        r.yearly_month = Some(0);
        r.yearly_date = Some(15);
        assert!(is_due(&r, noon(2024, 1, 15)));
        assert!(is_due(&r, noon(2025, 1, 15)));
        assert!(!is_due(&r, noon(2024, 2, 15)));
    }

    #[test]
    fn interval_uses_full_timestamp_precision() {
        let mut r = Routine::new("r", "Water plants", FrequencyType::Interval);
        r.interval_number = Some(2);
        r.interval_unit = Some(IntervalUnit::Days);
        assert!(is_due(&r, at("2024-01-01T00:00:00Z")), "never completed");

        r.last_completed = Some(at("2024-01-01T10:00:00Z"));
        assert!(!is_due(&r, at("2024-01-02T09:00:00Z")));
        assert!(is_due(&r, at("2024-01-03T11:00:00Z")));
    }

    #[test]
    fn interval_in_hours_and_weeks() {
        let mut r = Routine::new("r", "Stretch", FrequencyType::Interval);
        r.interval_number = Some(6);
        r.interval_unit = Some(IntervalUnit::Hours);
        r.last_completed = Some(at("2024-01-01T08:00:00Z"));
        assert!(!is_due(&r, at("2024-01-01T13:59:59Z")));
        assert!(is_due(&r, at("2024-01-01T14:00:00Z")));

        r.interval_number = Some(1);
        r.interval_unit = Some(IntervalUnit::Weeks);
        assert!(!is_due(&r, at("2024-01-07T08:00:00Z")));
        assert!(is_due(&r, at("2024-01-08T08:00:00Z")));
    }

    #[test]
    fn unknown_frequency_falls_back_to_always() {
        let r: Routine = serde_json::from_value(serde_json::json!({
            "id": "x",
            "name": "Legacy",
            "frequencyType": "fortnightly"
        }))
        .unwrap();
        assert_eq!(r.frequency_type, FrequencyType::Unknown);
        assert!(is_due(&r, noon(2024, 5, 5)));
    }

    #[test]
    fn day_boundaries_follow_the_offset() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(start_of_day(d, plus3).unwrap(), at("2023-12-31T21:00:00Z"));
        assert_eq!(end_of_day(d, plus3).unwrap(), at("2024-01-01T20:59:59Z"));
    }
}
