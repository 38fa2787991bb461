//! Turns an approved request into a ledger debit and a booking, atomically.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqliteConnection;

use crate::config::LeaveConfig;
use crate::db;
use crate::error::LeaveResult;
use crate::leave::{calendar, catalog, ledger, requests};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::model::ledger::{LeaveBooking, NewLedgerEntry, REASON_APPROVAL_POST};

#[derive(Debug, Clone)]
pub struct PostingOutcome {
    pub request: LeaveRequest,
    pub charged_leave_type: LeaveType,
    pub units: f64,
    /// Balance after the debit, for types that count against balance.
    pub remaining_balance: Option<f64>,
    pub ledger_entry_id: Option<i64>,
    pub booking: LeaveBooking,
}

/// Posts `request_id` inside one `BEGIN IMMEDIATE` transaction. Any failure
/// rolls back every write and leaves the request `approved`.
pub async fn post(
    conn: &mut SqliteConnection,
    config: &LeaveConfig,
    request_id: i64,
    charge_to_override: Option<i64>,
    now: DateTime<Utc>,
) -> LeaveResult<PostingOutcome> {
    let mut tx = db::begin_immediate(conn).await?;
    let result = post_locked(&mut tx, config, request_id, charge_to_override, now).await;
    let outcome = db::finish(tx, result).await;

    match &outcome {
        Ok(o) => tracing::info!(
            request_id,
            leave_type = %o.charged_leave_type.code,
            units = o.units,
            booking_id = o.booking.id,
            "Leave request posted"
        ),
        Err(e) => tracing::warn!(request_id, error = %e, "Leave posting rolled back"),
    }
    outcome
}

async fn post_locked(
    conn: &mut SqliteConnection,
    config: &LeaveConfig,
    request_id: i64,
    charge_to_override: Option<i64>,
    now: DateTime<Utc>,
) -> LeaveResult<PostingOutcome> {
    let request = requests::fetch(conn, request_id).await?;
    requests::ensure_status(&request, LeaveStatus::Approved)?;

    let charged_id = charge_to_override
        .or(request.charge_to_leave_type_id)
        .unwrap_or(request.leave_type_id);
    let charged = catalog::leave_type(conn, charged_id).await?;

    let units = calendar::leave_units_for_request(
        conn,
        &config.weekend_days,
        request.id,
        request.school_year_id,
        request.part_day,
    )
    .await?;

    let mut remaining_balance = None;
    let mut ledger_entry_id = None;
    if charged.counts_against_balance {
        let balance =
            ledger::balance(conn, request.employee_id, request.school_year_id, charged.id).await?;
        ledger::ensure_covers(balance, units)?;
        remaining_balance = Some(balance - units);

        if units > 0.0 {
            let filed = catalog::leave_type(conn, request.leave_type_id).await?;
            let entry = NewLedgerEntry {
                employee_id: request.employee_id,
                school_year_id: request.school_year_id,
                leave_type_id: charged.id,
                qty_days: -units,
                reason: REASON_APPROVAL_POST.to_string(),
                reference_id: Some(request.id),
                metadata: Some(json!({
                    "requested_leave_type_id": filed.id,
                    "requested_leave_type_code": filed.code,
                    "period": request.period().display_text(),
                })),
            };
            ledger_entry_id = Some(ledger::append(conn, &entry, now).await?);
        }
    }

    let booking = ledger::book(
        conn,
        request.employee_id,
        charged.id,
        request.id,
        request.period(),
        now,
    )
    .await?;

    if charge_to_override.is_some_and(|id| Some(id) != request.charge_to_leave_type_id) {
        requests::set_charge_to(conn, request.id, charged.id).await?;
    }
    requests::transition(conn, &request, LeaveStatus::Posted, now).await?;

    Ok(PostingOutcome {
        request: requests::fetch(conn, request.id).await?,
        charged_leave_type: charged,
        units,
        remaining_balance,
        ledger_entry_id,
        booking,
    })
}
