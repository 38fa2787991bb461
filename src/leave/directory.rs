//! Read-only queries over the employee directory and org-unit tree.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::error::{LeaveError, LeaveResult};
use crate::model::employee::Employee;
use crate::model::org_unit::{OrgUnit, RoleAssignment};

pub async fn employee(conn: &mut SqliteConnection, employee_id: i64) -> LeaveResult<Employee> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_code, first_name, last_name, birth_date, employment_class
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LeaveError::not_found(format!("employee {employee_id}")))
}

/// Assignments in effect for the employee on `date`.
pub async fn assignments_on(
    conn: &mut SqliteConnection,
    employee_id: i64,
    date: NaiveDate,
) -> LeaveResult<Vec<RoleAssignment>> {
    let rows = sqlx::query_as::<_, RoleAssignment>(
        r#"
        SELECT id, employee_id, org_unit_id, role_code, valid_from, valid_to
        FROM role_assignments
        WHERE employee_id = ?
          AND valid_from <= ?
          AND (valid_to IS NULL OR valid_to > ?)
        ORDER BY valid_from DESC, id DESC
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// The employee's org unit on `date`; the most recently started assignment wins.
pub async fn org_unit_of(
    conn: &mut SqliteConnection,
    employee_id: i64,
    date: NaiveDate,
) -> LeaveResult<Option<i64>> {
    Ok(assignments_on(conn, employee_id, date)
        .await?
        .first()
        .map(|a| a.org_unit_id))
}

pub async fn org_units(conn: &mut SqliteConnection) -> LeaveResult<Vec<OrgUnit>> {
    let rows = sqlx::query_as::<_, OrgUnit>(
        "SELECT id, name, parent_id, reports_to_president FROM org_units ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Every assignment (any employee, any unit) in effect on `date`.
pub async fn all_assignments_on(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> LeaveResult<Vec<RoleAssignment>> {
    let rows = sqlx::query_as::<_, RoleAssignment>(
        r#"
        SELECT id, employee_id, org_unit_id, role_code, valid_from, valid_to
        FROM role_assignments
        WHERE valid_from <= ?
          AND (valid_to IS NULL OR valid_to > ?)
        ORDER BY id
        "#,
    )
    .bind(date)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
