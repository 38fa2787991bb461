//! Enforcement points of the request lifecycle: before submission and at
//! final approval.

use chrono::{Datelike, NaiveDate};
use sqlx::SqliteConnection;

use crate::config::LeaveConfig;
use crate::error::{LeaveError, LeaveResult};
use crate::leave::{calendar, capacity, catalog, directory, policy, requests};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, MED_CERT};
use crate::model::leave_type::{BIRTHDAY_LEAVE, LeaveType};

/// What a successful pre-submission check established.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitCheck {
    pub units: f64,
}

/// Part-day requests must cover exactly one day.
fn check_part_day(request: &LeaveRequest) -> LeaveResult<()> {
    if request.part_day.is_some() && request.period().calendar_days() != 1 {
        return Err(LeaveError::validation(
            "part_day",
            "a half-day (AM/PM) request must cover a single day",
        ));
    }
    Ok(())
}

fn check_birthday(birth_date: NaiveDate, request: &LeaveRequest, units: f64) -> LeaveResult<()> {
    if request.start_date.month() != birth_date.month() {
        return Err(LeaveError::validation(
            "start_date",
            "birthday leave must be taken in the birth month",
        ));
    }
    if units > 1.0 {
        return Err(LeaveError::validation(
            "end_date",
            format!("birthday leave is limited to 1 day, requested {units}"),
        ));
    }
    Ok(())
}

async fn check_charge_to(
    conn: &mut SqliteConnection,
    leave_type: &LeaveType,
    request: &LeaveRequest,
) -> LeaveResult<()> {
    let Some(target) = request.charge_to_leave_type_id else {
        return Ok(());
    };
    let allowed = catalog::chargeable_targets(conn, leave_type.id).await?;
    if !allowed.contains(&target) {
        return Err(LeaveError::validation(
            "charge_to_leave_type_id",
            format!("{} cannot be charged to leave type {target}", leave_type.code),
        ));
    }
    Ok(())
}

async fn has_document(conn: &mut SqliteConnection, request_id: i64, doc_type: &str) -> LeaveResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_request_documents WHERE leave_request_id = ? AND doc_type = ?",
    )
    .bind(request_id)
    .bind(doc_type)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

async fn check_capacity(conn: &mut SqliteConnection, request: &LeaveRequest) -> LeaveResult<()> {
    let report = capacity::check(conn, request).await?;
    if !report.allowed {
        return Err(LeaveError::capacity(report.reasons()));
    }
    Ok(())
}

/// Runs the submission rules in order and stops at the first violation.
pub async fn validate_before_submit(
    conn: &mut SqliteConnection,
    config: &LeaveConfig,
    today: NaiveDate,
    request_id: i64,
) -> LeaveResult<SubmitCheck> {
    let request = requests::fetch(conn, request_id).await?;
    requests::ensure_status(&request, LeaveStatus::Draft)?;
    check_part_day(&request)?;

    let leave_type = catalog::leave_type(conn, request.leave_type_id).await?;
    let policy = policy::resolve_policy(
        conn,
        request.school_year_id,
        request.leave_type_id,
        request.employee_id,
    )
    .await?;
    let rules = policy::effective_rules(&leave_type, policy.as_ref());

    if rules.prior_notice_days > 0 {
        let notice = calendar::working_days(
            conn,
            &config.weekend_days,
            today,
            request.start_date,
            request.school_year_id,
        )
        .await?;
        if notice < rules.prior_notice_days {
            return Err(LeaveError::validation(
                "start_date",
                format!(
                    "{} requires {} working day(s) notice, only {notice} available",
                    leave_type.code, rules.prior_notice_days
                ),
            ));
        }
    }

    let units = calendar::leave_units(
        conn,
        &config.weekend_days,
        request.period(),
        request.school_year_id,
        request.part_day,
    )
    .await?;

    if leave_type.code == BIRTHDAY_LEAVE {
        let employee = directory::employee(conn, request.employee_id).await?;
        check_birthday(employee.birth_date, &request, units)?;
    }

    if rules.requires_med_cert && !has_document(conn, request.id, MED_CERT).await? {
        return Err(LeaveError::validation(
            MED_CERT,
            format!("{} requires a medical certificate", leave_type.code),
        ));
    }

    check_charge_to(conn, &leave_type, &request).await?;

    if units <= 0.0 {
        return Err(LeaveError::validation(
            "period",
            "the requested period has no chargeable working days",
        ));
    }

    if config.capacity_enforcement.at_submit() {
        check_capacity(conn, &request).await?;
    }

    tracing::debug!(request_id, units, "Leave request passed submission checks");
    Ok(SubmitCheck { units })
}

/// Re-runs capacity when approval-time enforcement is configured. Never
/// mutates the request.
pub async fn validate_at_approval(
    conn: &mut SqliteConnection,
    config: &LeaveConfig,
    request_id: i64,
) -> LeaveResult<()> {
    if !config.capacity_enforcement.at_approval() {
        return Ok(());
    }
    let request = requests::fetch(conn, request_id).await?;
    check_capacity(conn, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(start: NaiveDate, end: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 1,
            school_year_id: 1,
            leave_type_id: 1,
            charge_to_leave_type_id: None,
            start_date: start,
            end_date: end,
            part_day: None,
            reason: None,
            status: LeaveStatus::Draft,
            submitted_at: None,
            decided_at: None,
            posted_at: None,
            created_at: Utc::now(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn birthday_leave_must_match_birth_month() {
        let req = request(d(2026, 4, 14), d(2026, 4, 15));
        let err = check_birthday(d(1990, 3, 14), &req, 1.0).unwrap_err();
        assert!(matches!(err, LeaveError::Validation { field: "start_date", .. }));
        assert!(check_birthday(d(1990, 4, 2), &req, 1.0).is_ok());
    }

    #[test]
    fn birthday_leave_caps_at_one_unit() {
        let req = request(d(2026, 3, 2), d(2026, 3, 4));
        let err = check_birthday(d(1990, 3, 14), &req, 2.0).unwrap_err();
        assert!(matches!(err, LeaveError::Validation { field: "end_date", .. }));
    }

    #[test]
    fn part_day_needs_single_day_period() {
        let mut req = request(d(2026, 3, 2), d(2026, 3, 4));
        req.part_day = Some(crate::model::leave_request::PartDay::Am);
        assert!(check_part_day(&req).is_err());
        req.end_date = d(2026, 3, 3);
        assert!(check_part_day(&req).is_ok());
    }
}
