//! Append-only balance ledger and committed leave bookings.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::error::{LeaveError, LeaveResult};
use crate::model::ledger::{LeaveBooking, LedgerEntry, NewLedgerEntry};
use crate::model::period::DateRange;

/// Tolerance for balance comparisons on fractional days.
pub const BALANCE_EPSILON: f64 = 1e-9;

pub async fn balance(
    conn: &mut SqliteConnection,
    employee_id: i64,
    school_year_id: i64,
    leave_type_id: i64,
) -> LeaveResult<f64> {
    let sum = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(qty_days), 0.0)
        FROM leave_balance_ledger
        WHERE employee_id = ? AND school_year_id = ? AND leave_type_id = ?
        "#,
    )
    .bind(employee_id)
    .bind(school_year_id)
    .bind(leave_type_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(sum)
}

/// Fails when taking `units` from `balance` would go below zero.
pub fn ensure_covers(balance: f64, units: f64) -> LeaveResult<()> {
    if balance - units < -BALANCE_EPSILON {
        return Err(LeaveError::InsufficientBalance {
            balance,
            requested: units,
        });
    }
    Ok(())
}

pub async fn append(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry,
    now: DateTime<Utc>,
) -> LeaveResult<i64> {
    let metadata = entry.metadata.as_ref().map(|m| m.to_string());
    let result = sqlx::query(
        r#"
        INSERT INTO leave_balance_ledger
            (employee_id, school_year_id, leave_type_id, qty_days, reason, reference_id, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.employee_id)
    .bind(entry.school_year_id)
    .bind(entry.leave_type_id)
    .bind(entry.qty_days)
    .bind(entry.reason.as_str())
    .bind(entry.reference_id)
    .bind(metadata)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn entries(
    conn: &mut SqliteConnection,
    employee_id: i64,
    school_year_id: i64,
    leave_type_id: i64,
) -> LeaveResult<Vec<LedgerEntry>> {
    let rows = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT id, employee_id, school_year_id, leave_type_id, qty_days, reason, reference_id, metadata, created_at
        FROM leave_balance_ledger
        WHERE employee_id = ? AND school_year_id = ? AND leave_type_id = ?
        ORDER BY id
        "#,
    )
    .bind(employee_id)
    .bind(school_year_id)
    .bind(leave_type_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// First existing booking for the employee and type overlapping `period`.
pub async fn overlapping_booking(
    conn: &mut SqliteConnection,
    employee_id: i64,
    leave_type_id: i64,
    period: DateRange,
) -> LeaveResult<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM leave_bookings
        WHERE employee_id = ?
          AND leave_type_id = ?
          AND start_date < ?
          AND end_date > ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .bind(period.end)
    .bind(period.start)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

/// Inserts a booking after checking it does not overlap an existing one.
pub async fn book(
    conn: &mut SqliteConnection,
    employee_id: i64,
    leave_type_id: i64,
    leave_request_id: i64,
    period: DateRange,
    now: DateTime<Utc>,
) -> LeaveResult<LeaveBooking> {
    if let Some(conflicting_booking_id) =
        overlapping_booking(conn, employee_id, leave_type_id, period).await?
    {
        return Err(LeaveError::BookingConflict {
            conflicting_booking_id,
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leave_bookings (employee_id, leave_type_id, leave_request_id, start_date, end_date, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .bind(leave_request_id)
    .bind(period.start)
    .bind(period.end)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(LeaveBooking {
        id: result.last_insert_rowid(),
        employee_id,
        leave_type_id,
        leave_request_id,
        start_date: period.start,
        end_date: period.end,
        created_at: now,
    })
}

pub async fn booking_for_request(
    conn: &mut SqliteConnection,
    leave_request_id: i64,
) -> LeaveResult<Option<LeaveBooking>> {
    let booking = sqlx::query_as::<_, LeaveBooking>(
        r#"
        SELECT id, employee_id, leave_type_id, leave_request_id, start_date, end_date, created_at
        FROM leave_bookings
        WHERE leave_request_id = ?
        "#,
    )
    .bind(leave_request_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_balance_is_enough() {
        assert!(ensure_covers(2.0, 2.0).is_ok());
        assert!(ensure_covers(0.1 + 0.2, 0.3).is_ok());
    }

    #[test]
    fn overdraw_reports_balance_and_request() {
        match ensure_covers(1.5, 2.0) {
            Err(LeaveError::InsufficientBalance { balance, requested }) => {
                assert_eq!(balance, 1.5);
                assert_eq!(requested, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
