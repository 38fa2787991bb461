use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;
use crate::model::ledger::LedgerEntry;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the caller's own employee record
    #[schema(example = 1000)]
    pub employee_id: Option<i64>,
    #[schema(example = 4)]
    pub school_year_id: i64,
    #[schema(example = 2)]
    pub leave_type_id: i64,
}

#[derive(Serialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(example = 1000)]
    pub employee_id: i64,
    #[schema(example = 4)]
    pub school_year_id: i64,
    #[schema(example = 2)]
    pub leave_type_id: i64,
    #[schema(example = 7.5)]
    pub balance: f64,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Deserialize, ToSchema)]
pub struct BalanceAdjustment {
    #[schema(example = 1000)]
    pub employee_id: i64,
    #[schema(example = 4)]
    pub school_year_id: i64,
    #[schema(example = 2)]
    pub leave_type_id: i64,
    /// Positive credits, negative debits
    #[schema(example = 15.0)]
    pub qty_days: f64,
    #[schema(example = "Annual accrual", nullable = true)]
    pub note: Option<String>,
}

/* =========================
Balance and ledger history
========================= */
#[utoipa::path(
    get,
    path = "/api/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Current balance with its ledger entries", body = BalanceResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn get_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) if Some(id) != auth.employee_id => {
            auth.require_leave_officer()?;
            id
        }
        Some(id) => id,
        None => auth.require_employee()?,
    };

    let balance = service
        .balance(employee_id, query.school_year_id, query.leave_type_id)
        .await?;
    let entries = service
        .ledger_entries(employee_id, query.school_year_id, query.leave_type_id)
        .await?;

    Ok(HttpResponse::Ok().json(BalanceResponse {
        employee_id,
        school_year_id: query.school_year_id,
        leave_type_id: query.leave_type_id,
        balance,
        entries,
    }))
}

/* =========================
Manual adjustment (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/balance/adjustments",
    request_body(content = BalanceAdjustment, content_type = "application/json"),
    responses(
        (status = 200, description = "Adjustment recorded", body = Object, example = json!({
            "message": "Balance adjusted",
            "balance": 15.0
        })),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Debit exceeds balance"),
        (status = 422, description = "Invalid quantity")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<BalanceAdjustment>,
) -> actix_web::Result<impl Responder> {
    auth.require_leave_officer()?;
    let p = payload.into_inner();

    let balance = service
        .adjust_balance(
            auth.actor(),
            p.employee_id,
            p.school_year_id,
            p.leave_type_id,
            p.qty_days,
            p.note,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Balance adjusted",
        "balance": balance
    })))
}
