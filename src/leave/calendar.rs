//! Working-day arithmetic against weekend rules and the holiday calendar.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use sqlx::SqliteConnection;

use crate::error::{LeaveError, LeaveResult};
use crate::model::holiday::Holiday;
use crate::model::leave_request::PartDay;
use crate::model::period::DateRange;

/// Counts dates in `range` that are neither weekend days nor in `closed`.
pub fn count_working_days(range: DateRange, weekend: &[Weekday], closed: &HashSet<NaiveDate>) -> i64 {
    range
        .dates()
        .filter(|d| !weekend.contains(&d.weekday()) && !closed.contains(d))
        .count() as i64
}

/// A part-day request gives back half a unit off the last day, never going below 0.5.
pub fn part_day_units(working_days: i64, part_day: Option<PartDay>) -> f64 {
    let days = working_days as f64;
    match part_day {
        Some(_) if working_days > 0 => (days - 0.5).max(0.5),
        _ => days,
    }
}

/// Dates inside `range` closed by a non-working holiday of the school year.
pub async fn closed_dates(
    conn: &mut SqliteConnection,
    school_year_id: i64,
    range: DateRange,
) -> LeaveResult<HashSet<NaiveDate>> {
    let holidays = sqlx::query_as::<_, Holiday>(
        r#"
        SELECT id, school_year_id, name, start_date, end_date, is_working_day
        FROM holidays
        WHERE school_year_id = ?
          AND is_working_day = 0
          AND start_date < ?
          AND end_date > ?
        "#,
    )
    .bind(school_year_id)
    .bind(range.end)
    .bind(range.start)
    .fetch_all(&mut *conn)
    .await?;

    Ok(holidays
        .iter()
        .filter_map(|h| h.period().intersection(&range))
        .flat_map(|r| r.dates().collect::<Vec<_>>())
        .collect())
}

/// Working days in `[start, end)`; zero when `end <= start`.
pub async fn working_days(
    conn: &mut SqliteConnection,
    weekend: &[Weekday],
    start: NaiveDate,
    end: NaiveDate,
    school_year_id: i64,
) -> LeaveResult<i64> {
    let Some(range) = DateRange::new(start, end) else {
        return Ok(0);
    };
    let closed = closed_dates(conn, school_year_id, range).await?;
    Ok(count_working_days(range, weekend, &closed))
}

/// Chargeable units for a period.
pub async fn leave_units(
    conn: &mut SqliteConnection,
    weekend: &[Weekday],
    period: DateRange,
    school_year_id: i64,
    part_day: Option<PartDay>,
) -> LeaveResult<f64> {
    let days = working_days(conn, weekend, period.start, period.end, school_year_id).await?;
    let units = part_day_units(days, part_day);
    tracing::debug!(start = %period.start, end = %period.end, days, units, "Computed leave units");
    Ok(units)
}

/// Chargeable units for a stored request.
pub async fn leave_units_for_request(
    conn: &mut SqliteConnection,
    weekend: &[Weekday],
    request_id: i64,
    school_year_id: i64,
    part_day: Option<PartDay>,
) -> LeaveResult<f64> {
    let (start, end) = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
        "SELECT start_date, end_date FROM leave_requests WHERE id = ?",
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))?;

    leave_units(conn, weekend, DateRange::new_unchecked(start, end), school_year_id, part_day).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn any_seven_day_span_has_five_working_days() {
        let first = d(2026, 1, 1);
        for offset in 0..21 {
            let start = first + Duration::days(offset);
            let range = DateRange::new(start, start + Duration::days(7)).unwrap();
            assert_eq!(
                count_working_days(range, &WEEKEND, &HashSet::new()),
                5,
                "week starting {start}"
            );
        }
    }

    #[test]
    fn closed_dates_are_not_counted() {
        // Mon 2026-03-02 .. Fri 2026-03-06 with Wednesday closed
        let range = DateRange::new(d(2026, 3, 2), d(2026, 3, 7)).unwrap();
        let closed: HashSet<_> = [d(2026, 3, 4)].into_iter().collect();
        assert_eq!(count_working_days(range, &WEEKEND, &closed), 4);

        let all_closed: HashSet<_> = range.dates().collect();
        assert_eq!(count_working_days(range, &WEEKEND, &all_closed), 0);
    }

    #[test]
    fn friday_weekend_shifts_the_count() {
        // Fri 2026-03-06 .. Sun 2026-03-08 inclusive
        let range = DateRange::new(d(2026, 3, 6), d(2026, 3, 9)).unwrap();
        assert_eq!(
            count_working_days(range, &[Weekday::Fri, Weekday::Sat], &HashSet::new()),
            1
        );
    }

    #[test]
    fn part_day_never_drops_below_half() {
        assert_eq!(part_day_units(1, Some(PartDay::Am)), 0.5);
        assert_eq!(part_day_units(3, Some(PartDay::Pm)), 2.5);
        assert_eq!(part_day_units(0, Some(PartDay::Am)), 0.0);
        assert_eq!(part_day_units(2, None), 2.0);
        for days in 1..10 {
            assert!(part_day_units(days, Some(PartDay::Pm)) >= 0.5);
        }
    }
}
