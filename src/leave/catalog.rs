//! Leave-type configuration lookups.

use sqlx::SqliteConnection;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_type::LeaveType;

pub async fn leave_type(conn: &mut SqliteConnection, leave_type_id: i64) -> LeaveResult<LeaveType> {
    sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, code, name, counts_against_balance, requires_med_cert, requires_prior_notice_days
        FROM leave_types
        WHERE id = ?
        "#,
    )
    .bind(leave_type_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LeaveError::not_found(format!("leave type {leave_type_id}")))
}

/// Leave types the given type may be re-charged to.
pub async fn chargeable_targets(
    conn: &mut SqliteConnection,
    leave_type_id: i64,
) -> LeaveResult<Vec<i64>> {
    let rows = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT target_leave_type_id
        FROM leave_type_charge_targets
        WHERE leave_type_id = ?
        ORDER BY target_leave_type_id
        "#,
    )
    .bind(leave_type_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
